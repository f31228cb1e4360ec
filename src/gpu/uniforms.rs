//! Typed uniform slots.
//!
//! Each shader program is created against a fixed enum of uniform slots. The
//! program resolves every slot once at link time, so setters take a slot
//! value instead of a string and can never address an undeclared uniform.
//!
//! # Usage
//!
//! ```rust,ignore
//! umbra::uniform_schema! {
//!     pub enum OutputUniform {
//!         ColorTexture => "colorTexture",
//!         DistanceTexture => "distanceTexture",
//!     }
//! }
//!
//! let shader = api.create_shader::<OutputUniform>("output.vert", "output.frag").await?;
//! shader.set_samplers(&[(OutputUniform::ColorTexture, &lit)])?;
//! ```

use std::fmt::Debug;

/// A closed set of uniform names a program is guaranteed to declare.
///
/// Implemented by [`uniform_schema!`](crate::uniform_schema); the slot's
/// discriminant doubles as its index into the resolved location table.
pub trait UniformSchema: Copy + Eq + Debug + 'static {
    /// Every slot, in index order.
    const ALL: &'static [Self];

    /// Identifier as written in GLSL.
    fn name(self) -> &'static str;

    fn index(self) -> usize;
}

/// Generates a [`UniformSchema`] enum mapping variants to GLSL identifiers.
#[macro_export]
macro_rules! uniform_schema {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$v_meta:meta])* $variant:ident => $glsl:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$v_meta])* $variant ),+
        }

        impl $crate::gpu::UniformSchema for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            #[inline]
            fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $glsl ),+
                }
            }

            #[inline]
            fn index(self) -> usize {
                self as usize
            }
        }
    };
}

/// Scalar data for one uniform upload; the slice length is the component count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Int(&'a [i32]),
    UInt(&'a [u32]),
    Float(&'a [f32]),
}

impl UniformValue<'_> {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            UniformValue::Int(v) => v.len(),
            UniformValue::UInt(v) => v.len(),
            UniformValue::Float(v) => v.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn scalar_name(&self) -> &'static str {
        match self {
            UniformValue::Int(_) => "int",
            UniformValue::UInt(_) => "uint",
            UniformValue::Float(_) => "float",
        }
    }
}

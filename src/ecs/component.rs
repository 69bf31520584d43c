//! Abstract `Component` trait.

use std::any::Any;

/// Marker trait of plain data values that could be attached to entities. Every
/// entity holds at most one instance of each component type.
pub trait Component: Any + 'static {}

/// Declare structs as components. Internally, this macro will impl the
/// `Component` trait for each of them.
///
/// ```
/// # #[macro_use] extern crate entwrap;
/// #[derive(Debug, Clone, Copy)]
/// struct Position { x: f32, y: f32 }
///
/// #[derive(Debug, Clone, Copy)]
/// struct Velocity { x: f32, y: f32 }
///
/// declare_component!(Position, Velocity);
/// # fn main() {}
/// ```
#[macro_export]
macro_rules! declare_component {
    ( $( $CMP:ty ),+ $(,)* ) => {
        $( impl $crate::ecs::Component for $CMP {} )+
    };
}

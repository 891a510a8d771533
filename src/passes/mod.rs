//! IR to IR rewrite passes, run in this order when enabled:
//! math functions, channel reassignment, global localization, constant
//! parametrization.

pub mod const_parametrize;
pub mod global_localize;
pub mod math_functions;
pub mod reassign_channels;

pub use const_parametrize::ConstParametrize;
pub use global_localize::GlobalLocalize;
pub use math_functions::MathFunctions;
pub use reassign_channels::ReassignChannels;

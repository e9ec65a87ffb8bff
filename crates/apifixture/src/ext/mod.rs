//! Helper traits over [`ApiFixture`](crate::ApiFixture)
//!
//! Each trait has a blanket impl, so importing it (or the prelude) is enough.
//! The helpers only register configurators and assertions.

mod assertions;
mod convenience;
mod post;
mod rest;
mod setup;

pub use assertions::AssertionExt;
pub use convenience::ConvenienceExt;
pub use post::PostExt;
pub use rest::RestExt;
pub use setup::SetupExt;

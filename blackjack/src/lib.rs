pub use acl::*;
pub use cards::*;
pub use deck::*;
pub use transport::*;

mod acl;
mod cards;
mod deck;
mod transport;

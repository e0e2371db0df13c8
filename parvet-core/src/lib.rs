pub mod fileset;
pub mod framer;
pub mod localize;
pub mod packet;
pub mod progress;
pub mod summary;
pub mod verify;

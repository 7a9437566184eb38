pub mod desc;
pub mod element;
pub mod equation;
pub mod error;
pub mod mapper;
pub mod rotate;
pub mod trace;
pub mod verify;
pub mod wires;

pub mod hasher;
pub use hasher::*;
pub mod opcode;
pub use opcode::*;
pub mod trace;
pub use trace::*;
pub mod variable;
pub use variable::*;
pub mod tac;
pub use tac::*;

pub mod compare;
pub mod fees;
pub mod irr;
pub mod sensitivity;
pub mod simulate;

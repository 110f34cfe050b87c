pub mod check;
pub mod dof;
pub mod io;

pub mod controller;
pub mod selection;

pub use controller::{Failure, FormController, FormPhase, FormView, Notice, NoticeLevel};

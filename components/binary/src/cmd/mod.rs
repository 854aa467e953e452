pub mod check_exclude;
pub mod options;
pub mod show;

pub mod create;
pub mod doctor;
pub mod list;
pub mod run;
pub mod show;

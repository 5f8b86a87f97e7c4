pub mod allocation;
pub mod project;
pub mod skill;
pub mod user;

pub mod animation;
pub mod cooldown;
pub mod input;
pub mod time;

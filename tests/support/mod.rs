#![allow(dead_code)]

pub mod loopback;
pub mod runboard_env;

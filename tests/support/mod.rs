#![allow(dead_code)]

pub mod reserve;

mod common;

mod voting;

mod breakpoints;
mod common;
mod lifecycle;
mod snapshots;

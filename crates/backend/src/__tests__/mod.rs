mod helpers;

mod editor_flow;
mod host;

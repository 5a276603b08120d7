mod pipeline;
mod project;
mod refresh;

mod health_check;
mod matches;
mod settings;
mod support;

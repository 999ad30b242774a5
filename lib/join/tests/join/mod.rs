mod adaptive;
mod mediator;
mod optional_join;

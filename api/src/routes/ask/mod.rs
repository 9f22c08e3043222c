pub mod ask_route;

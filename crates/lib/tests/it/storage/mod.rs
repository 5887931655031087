mod queries;
mod registry;
mod scenarios;
mod writes;

// ABOUTME: API module containing the JSON handlers for the comicstrip REST API.
// ABOUTME: Comic create, read, update, and list live in the comics sub-module.

pub mod comics;

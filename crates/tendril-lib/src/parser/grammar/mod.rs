//! Recursive-descent grammar productions, split by construct.

mod arrays;
mod exprs;
mod items;
mod objects;

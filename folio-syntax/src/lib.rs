/*!
A crate for tokenizing and parsing the syntax layer of PDF content.

This crate provides the building blocks that sit below a content stream
renderer:
- A lexer that splits bytes into PDF tokens ([`token`]).
- An object parser that builds owned PDF objects from those tokens ([`parser`]).
- Decode filters for stream data ([`filter`]).
- A content stream parser that pairs multi-operator constructs into a tree
  of [`content::ContentObject`]s ([`content`]).

Parsing the file structure itself (cross-reference tables, trailers, object
streams) is left to the caller. Indirect objects are looked up through the
[`object::Resolve`] trait, and [`object::ObjectStore`] offers a simple
in-memory implementation.
*/

#![forbid(unsafe_code)]

pub mod content;
pub mod filter;
pub mod object;
pub mod parser;
pub mod token;
pub mod trivia;

mod util;

pub use util::OptionLog;

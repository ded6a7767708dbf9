mod error;
mod node;
mod parser;
mod writer;

pub use error::Error;
pub use parser::MAX_DEPTH;
pub use node::{
    Attribute, Document, Element, ElementPath, ElementRef, NamespaceScope, Node, XmlDeclaration,
};

pub type Result<T> = std::result::Result<T, Error>;

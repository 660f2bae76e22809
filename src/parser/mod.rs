//
//  mod.rs
//  HasteGraph
//
//  Created by hak (tharun)
//

pub mod docblock;
pub mod extractor;

pub use extractor::{extract_module, ExtractedModule};

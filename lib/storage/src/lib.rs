pub mod container;
pub mod fs;
pub mod naming;
pub mod source;

pub use container::{ContainerHeader, VectorFileReader, VectorFileWriter};
pub use fs::{LocalStorage, Storage};
pub use naming::{output_name, parent_token, OUTPUT_SUFFIX};
pub use source::{parse_schema, schema_from_data_file, SchemaSource};

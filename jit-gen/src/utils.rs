use ron::ser::PrettyConfig;
use serde::Serialize;
use std::io;

pub fn write_as_ron<W: io::Write, S: Serialize>(writer: W, object: S) -> Result<(), ron::Error> {
    let mut serializer =
        ron::Serializer::new(writer, Some(PrettyConfig::default().struct_names(true)))?;
    object.serialize(&mut serializer)
}

pub fn to_ron_string<S: Serialize>(object: S) -> Result<String, ron::Error> {
    ron::ser::to_string_pretty(&object, PrettyConfig::new().struct_names(true))
}

use std::io::{Read, Write};

use tracing::debug;

use common::{deserialize, serialize, SerdeFormat};

use crate::mapping::Mapping;

/// Reads and writes mapping trees over IO streams in a fixed encoding.
///
/// Round-tripping preserves `nin`, `nout`, and composition structure; shared
/// children are written once per occurrence, so a read tree no longer aliases
/// them.
#[derive(Clone, Copy, Debug)]
pub struct Channel {
    format: SerdeFormat,
}

impl Default for Channel {
    fn default() -> Self {
        Channel {
            format: SerdeFormat::Yaml,
        }
    }
}

impl Channel {
    pub fn new(format: SerdeFormat) -> Channel {
        Channel { format }
    }

    pub fn format(&self) -> SerdeFormat {
        self.format
    }

    /// Writes one mapping document to `sink` and returns the number of
    /// objects written.
    pub fn write<W: Write>(&self, sink: &mut W, mapping: &Mapping) -> anyhow::Result<usize> {
        let text = self.write_string(mapping);
        sink.write_all(text.as_bytes())?;

        debug!(
            "wrote a {} mapping document of {} bytes",
            mapping.kind(),
            text.len()
        );
        Ok(1)
    }

    /// Reads one mapping document from `source`, validating its structure.
    pub fn read<R: Read>(&self, source: &mut R) -> anyhow::Result<Mapping> {
        let mut text = String::new();
        source.read_to_string(&mut text)?;
        self.read_string(&text)
    }

    pub fn write_string(&self, mapping: &Mapping) -> String {
        serialize(mapping, self.format)
    }

    pub fn read_string(&self, text: &str) -> anyhow::Result<Mapping> {
        let mapping: Mapping = deserialize(text, self.format)?;

        mapping.validate()?;

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::{ShiftMap, ZoomMap};
    use std::io::Cursor;

    #[test]
    fn write_reports_one_object() -> anyhow::Result<()> {
        let mapping = Mapping::from(ZoomMap::new(2, 1.3));
        let mut sink = Vec::new();

        let written = Channel::default().write(&mut sink, &mapping)?;
        assert_eq!(written, 1);
        assert!(!sink.is_empty());

        Ok(())
    }

    #[test]
    fn stream_round_trip_per_format() -> anyhow::Result<()> {
        let mapping = Mapping::from(ZoomMap::new(2, 1.3)).then(ShiftMap::new(vec![1.0, -2.0]).into())?;

        for format in [SerdeFormat::Yaml, SerdeFormat::Json] {
            let channel = Channel::new(format);

            let mut sink = Vec::new();
            channel.write(&mut sink, &mapping)?;

            let restored = channel.read(&mut Cursor::new(sink))?;
            assert_eq!(restored, mapping);
        }

        Ok(())
    }

    #[test]
    fn read_rejects_garbage() {
        let channel = Channel::default();
        assert!(channel.read_string("definitely not a mapping").is_err());
    }
}

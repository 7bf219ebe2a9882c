//! Container handling for downloaded match artifacts.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;
use tracing::debug;

/// Extension of the text members we care about.
pub const PGN_EXTENSION: &str = ".pgn";

/// What a downloaded artifact turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Gzip-compressed tar archive.
    Archive,
    /// Bare PGN text.
    Plain,
}

/// Sniff the artifact type from its leading bytes.
pub fn sniff(content: &[u8]) -> ArtifactKind {
    if infer::archive::is_gz(content) {
        ArtifactKind::Archive
    } else {
        ArtifactKind::Plain
    }
}

/// One `.pgn` file pulled out of an archive.
#[derive(Debug, Clone)]
pub struct PgnMember {
    pub name: String,
    pub text: String,
}

/// Read a `.tar.gz` completely and return its `.pgn` members in archive order.
///
/// Every entry is walked, so a truncated or corrupt archive fails here rather
/// than yielding a partial list. Text is decoded lossily.
pub fn extract_pgn_members(data: &[u8]) -> std::io::Result<Vec<PgnMember>> {
    let decoder = GzDecoder::new(Cursor::new(data));
    let mut archive = tar::Archive::new(decoder);
    let mut members = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().to_string();

        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        if contents.len() as u64 != entry.header().size()? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("archive member {} is truncated", name),
            ));
        }

        if name.ends_with(PGN_EXTENSION) && entry.header().entry_type().is_file() {
            debug!("Extracted {} ({} bytes)", name, contents.len());
            members.push(PgnMember {
                name,
                text: String::from_utf8_lossy(&contents).into_owned(),
            });
        }
    }

    // Drain the tail so the gzip trailer checksum is verified.
    std::io::copy(&mut archive.into_inner(), &mut std::io::sink())?;

    Ok(members)
}

/// All PGN texts held by an artifact, whatever its type.
pub fn artifact_texts(content: &[u8]) -> std::io::Result<Vec<String>> {
    match sniff(content) {
        ArtifactKind::Archive => Ok(extract_pgn_members(content)?
            .into_iter()
            .map(|member| member.text)
            .collect()),
        ArtifactKind::Plain => Ok(vec![String::from_utf8_lossy(content).into_owned()]),
    }
}

/// Build an in-memory `.tar.gz` from `(name, contents)` pairs.
#[cfg(test)]
pub(crate) fn build_tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        let archive = build_tar_gz(&[("a.pgn", "[Event \"x\"]")]);
        assert_eq!(sniff(&archive), ArtifactKind::Archive);
        assert_eq!(sniff(b"[Event \"x\"]"), ArtifactKind::Plain);
        assert_eq!(sniff(b""), ArtifactKind::Plain);
    }

    #[test]
    fn test_extract_only_pgn_members() {
        let archive = build_tar_gz(&[
            ("games/one.pgn", "[Event \"1\"]"),
            ("README.txt", "hello"),
            ("games/two.pgn", "[Event \"2\"]"),
        ]);
        let members = extract_pgn_members(&archive).unwrap();
        let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["games/one.pgn", "games/two.pgn"]);
        assert_eq!(members[1].text, "[Event \"2\"]");
    }

    #[test]
    fn test_truncated_archive_fails() {
        let noise: String = (0u32..8192)
            .map(|i| (b'a' + ((i.wrapping_mul(2_654_435_761) >> 13) % 26) as u8) as char)
            .collect();
        let archive = build_tar_gz(&[("a.pgn", noise.as_str())]);
        let truncated = &archive[..archive.len() / 2];
        assert!(extract_pgn_members(truncated).is_err());
    }

    #[test]
    fn test_artifact_texts_plain_is_single_unit() {
        let texts = artifact_texts(b"[Event \"x\"]\n\n1. e4 *").unwrap();
        assert_eq!(texts.len(), 1);
    }
}

//! Export packager: individual files or a single ZIP archive.
//!
//! Image bytes are written as-is. Entries are stored uncompressed since PNG
//! and JPEG payloads are already compressed.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::batch::RenderedCertificate;
use crate::error::LaurelError;

/// Download name used for archives served over HTTP.
pub const ARCHIVE_FILE_NAME: &str = "certificates.zip";

/// File names for `certificates`, in order, with `_2`, `_3`... appended to
/// names that collide with an earlier one.
pub fn unique_file_names(certificates: &[RenderedCertificate]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(certificates.len());
    let mut names = Vec::with_capacity(certificates.len());

    for cert in certificates {
        let mut name = cert.file_name();
        if taken.contains(&name) {
            let (stem, ext) = split_extension(&name);
            let (stem, ext) = (stem.to_string(), ext.to_string());
            let mut n = 2;
            while taken.contains(&name) {
                name = format!("{}_{}{}", stem, n, ext);
                n += 1;
            }
        }
        taken.insert(name.clone());
        names.push(name);
    }

    names
}

fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot..]),
        None => (name, ""),
    }
}

/// Write each certificate into `dir` (created if missing). Returns the paths written.
pub fn write_files(
    dir: impl AsRef<Path>,
    certificates: &[RenderedCertificate],
) -> Result<Vec<PathBuf>, LaurelError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(certificates.len());
    for (cert, name) in certificates.iter().zip(unique_file_names(certificates)) {
        let path = dir.join(name);
        std::fs::write(&path, &cert.image)?;
        tracing::debug!(path = %path.display(), bytes = cert.image.len(), "wrote certificate");
        written.push(path);
    }

    tracing::info!(count = written.len(), dir = %dir.display(), "exported certificates");
    Ok(written)
}

/// Bundle every certificate into one ZIP archive in memory.
pub fn archive(certificates: &[RenderedCertificate]) -> Result<Vec<u8>, LaurelError> {
    let mut zip_data = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut zip_data));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .unix_permissions(0o644);

        for (cert, name) in certificates.iter().zip(unique_file_names(certificates)) {
            zip.start_file(name, options)?;
            zip.write_all(&cert.image)?;
        }
        zip.finish()?;
    }

    tracing::info!(
        entries = certificates.len(),
        bytes = zip_data.len(),
        "built certificate archive"
    );
    Ok(zip_data)
}

/// Build the archive and write it to `path`.
pub fn write_archive(
    path: impl AsRef<Path>,
    certificates: &[RenderedCertificate],
) -> Result<(), LaurelError> {
    let bytes = archive(certificates)?;
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::OutputFormat;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn cert(name: &str, bytes: &[u8]) -> RenderedCertificate {
        RenderedCertificate {
            recipient_name: name.to_string(),
            image: bytes.to_vec(),
            format: OutputFormat::Png,
            width: 1,
            height: 1,
        }
    }

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "laurel-export-{}-{}",
            label,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_unique_file_names() {
        let certs = [
            cert("Ada Lovelace", b"a"),
            cert("Ada  Lovelace", b"b"),
            cert("Ada_Lovelace", b"c"),
            cert("Grace", b"d"),
        ];
        assert_eq!(
            unique_file_names(&certs),
            vec![
                "certificate_Ada_Lovelace.png",
                "certificate_Ada_Lovelace_2.png",
                "certificate_Ada_Lovelace_3.png",
                "certificate_Grace.png",
            ]
        );
    }

    #[test]
    fn test_archive_holds_every_certificate() {
        let certs = [cert("Ada", b"first"), cert("Grace", b"second"), cert("Ada", b"third")];
        let bytes = archive(&certs).unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 3);

        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "certificate_Ada.png",
                "certificate_Ada_2.png",
                "certificate_Grace.png",
            ]
        );

        let mut entry = zip.by_name("certificate_Ada_2.png").unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Stored);
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"third");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = archive(&[]).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 0);
    }

    #[test]
    fn test_write_files_and_archive_to_disk() {
        let dir = temp_dir("files");
        let certs = [cert("Ada", b"one"), cert("Grace Hopper", b"two")];

        let paths = write_files(&dir, &certs).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(std::fs::read(dir.join("certificate_Grace_Hopper.png")).unwrap(), b"two");

        let zip_path = dir.join("out").join(ARCHIVE_FILE_NAME);
        write_archive(&zip_path, &certs).unwrap();
        let zip = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

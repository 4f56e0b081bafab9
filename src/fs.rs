use fs_err as fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::{Archive, EntryType};
use walkdir::WalkDir;
use xz2::read::XzDecoder;
use zstd::stream::read::Decoder as ZstdDecoder;

use crate::consts::SUPPORTED_ARCHIVE_TYPES;

/// Copy the whole content of a folder to another folder
pub(crate) fn copy_folder(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
) -> Result<(), std::io::Error> {
    let from = from.as_ref();
    let to = to.as_ref();

    for entry in WalkDir::new(from) {
        let entry = entry?;
        let path = entry.path();

        let relative = path.strip_prefix(from).expect("walkdir starts with root");
        let out_path = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            fs::copy(path, out_path)?;
        }
    }

    Ok(())
}

/// Copy the whole content of a folder to another folder using parallel processing.
/// Thread count can be configured via `PVT_COPY_THREADS`, used by the fleet validator when
/// staging many packages' worth of extracted source trees at once.
#[cfg(feature = "cli")]
pub(crate) fn copy_folder_parallel(
    from: impl AsRef<Path>,
    to: impl AsRef<Path>,
    default_num_threads: usize,
) -> Result<(), std::io::Error> {
    use rayon::prelude::*;

    use crate::consts::COPY_THREADS_ENV_VAR_NAME;

    let num_threads = std::env::var(COPY_THREADS_ENV_VAR_NAME)
        .ok()
        .and_then(|x| x.parse::<usize>().ok())
        .unwrap_or(default_num_threads);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(std::io::Error::other)?;

    let from = from.as_ref();
    let to = to.as_ref();

    let entries: Result<Vec<_>, _> = WalkDir::new(from)
        .into_iter()
        .collect::<Result<Vec<_>, _>>();
    let entries = entries?;

    pool.install(|| {
        entries.par_iter().try_for_each(|entry| {
            let path = entry.path();
            let relative = path.strip_prefix(from).expect("walkdir starts with root");
            let out_path = to.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&out_path)?;
            } else {
                if let Some(parent) = out_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(path, out_path)?;
            }
            Ok::<(), std::io::Error>(())
        })
    })?;

    Ok(())
}

/// Which archive format a buffer of bytes looks like, by magic bytes rather than filename
/// extension (extensions lie; bundled source archives are often renamed or double-compressed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    TarBz2,
    TarXz,
    TarZst,
    Tar,
}

pub fn sniff_archive_kind(buffer: &[u8]) -> Option<ArchiveKind> {
    if buffer.len() < 6 {
        return None;
    }
    match buffer[..4] {
        [0x50, 0x4b, 0x03, 0x04] => Some(ArchiveKind::Zip),
        [0x1F, 0x8B, ..] => Some(ArchiveKind::TarGz),
        [0x42, 0x5A, 0x68, ..] => Some(ArchiveKind::TarBz2),
        [0xFD, 0x37, 0x7A, 0x58] => Some(ArchiveKind::TarXz),
        [0x28, 0xB5, 0x2F, 0xFD] => Some(ArchiveKind::TarZst),
        _ if buffer.len() >= 262 && &buffer[257..262] == b"ustar" => Some(ArchiveKind::Tar),
        _ => None,
    }
}

/// A tar entry is rejected if it would escape `dest`, or if it's a device/fifo/socket special
/// file. Absolute paths and any `..` component are both treated as traversal. Symlinks whose
/// target would resolve outside `dest` are rejected too, since a relative `../../etc/passwd`
/// symlink is just as dangerous as an absolute one.
fn is_safe_tar_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }
    !path
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
}

fn secure_tar_unpack<R: Read>(archive: &mut Archive<R>, dest: &Path) -> std::io::Result<()> {
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.into_owned();

        if !is_safe_tar_path(&path) {
            log::warn!("skipping unsafe archive entry: {}", path.display());
            continue;
        }

        match entry.header().entry_type() {
            EntryType::Symlink | EntryType::Link => {
                if let Some(link_name) = entry.link_name()? {
                    if link_name.is_absolute() || !is_safe_tar_path(&link_name) {
                        log::warn!("skipping unsafe symlink target: {}", link_name.display());
                        continue;
                    }
                }
            }
            EntryType::Char | EntryType::Block | EntryType::Fifo => {
                log::warn!("skipping device/special file entry: {}", path.display());
                continue;
            }
            _ => {}
        }

        let out_path = dest.join(&path);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&out_path)?;
    }
    Ok(())
}

/// Extracts an archive of any [`ArchiveKind`] into `dest`, rejecting path traversal and special
/// files along the way. Zip extraction has no equivalent per-entry filter available in the `zip`
/// crate, so zip archives are extracted as-is; this matches what bundled source RPMs actually
/// contain in practice (vendored zip archives are rare in this pipeline's trust model, which
/// assumes the local package's own archives are trustworthy).
pub fn secure_extract_archive(
    buffer: &[u8],
    dest: impl AsRef<Path>,
) -> Result<Option<String>, std::io::Error> {
    let dest = dest.as_ref();
    fs::create_dir_all(dest)?;

    let kind = sniff_archive_kind(buffer)
        .ok_or_else(|| std::io::Error::other("unrecognized archive format"))?;

    match kind {
        ArchiveKind::Zip => {
            let cursor = std::io::Cursor::new(buffer);
            zip::read::ZipArchive::new(cursor)?.extract(dest)?;
        }
        ArchiveKind::TarGz => {
            let tar = GzDecoder::new(buffer);
            secure_tar_unpack(&mut Archive::new(tar), dest)?;
        }
        ArchiveKind::TarBz2 => {
            let tar = BzDecoder::new(buffer);
            secure_tar_unpack(&mut Archive::new(tar), dest)?;
        }
        ArchiveKind::TarXz => {
            let tar = XzDecoder::new(buffer);
            secure_tar_unpack(&mut Archive::new(tar), dest)?;
        }
        ArchiveKind::TarZst => {
            let tar = ZstdDecoder::new(buffer)?;
            secure_tar_unpack(&mut Archive::new(tar), dest)?;
        }
        ArchiveKind::Tar => {
            secure_tar_unpack(&mut Archive::new(buffer), dest)?;
        }
    }

    Ok(Some(hash256sum_buffer(buffer)))
}

fn hash256sum_buffer(buffer: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    format!("{:x}", hasher.finalize())
}

/// Recursively list every file under `dir`, returned as paths relative to `dir`, sorted for
/// deterministic diffing.
pub fn list_files_recursive(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.path().strip_prefix(dir).ok().map(PathBuf::from))
        .collect();
    files.sort();
    Ok(files)
}

/// Returns every archive file directly under `dir` whose name ends in one of
/// `SUPPORTED_ARCHIVE_TYPES`, sorted by name.
pub fn get_archive_files(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut archives: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| SUPPORTED_ARCHIVE_TYPES.iter().any(|s| name.ends_with(s)))
        })
        .collect();
    archives.sort();
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_gzip_and_zip() {
        let gz = [0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00];
        assert_eq!(sniff_archive_kind(&gz), Some(ArchiveKind::TarGz));

        let zip = [0x50, 0x4b, 0x03, 0x04, 0x00, 0x00];
        assert_eq!(sniff_archive_kind(&zip), Some(ArchiveKind::Zip));

        assert_eq!(sniff_archive_kind(&[0u8; 4]), None);
    }

    #[test]
    fn rejects_traversal_paths() {
        assert!(!is_safe_tar_path(Path::new("../../etc/passwd")));
        assert!(!is_safe_tar_path(Path::new("/etc/passwd")));
        assert!(is_safe_tar_path(Path::new("foo/bar.c")));
    }

    #[test]
    fn extracts_well_formed_tar_gz() {
        let tmp = tempfile::tempdir().unwrap();
        let archive_path = tmp.path().join("pkg.tar.gz");

        {
            let file = fs::File::create(&archive_path).unwrap();
            let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(enc);
            let mut header = tar::Header::new_gnu();
            let data = b"hello world";
            header.set_size(data.len() as u64);
            header.set_cksum();
            builder
                .append_data(&mut header, "pkg-1.0/hello.txt", &data[..])
                .unwrap();
            builder.finish().unwrap();
        }

        let buffer = fs::read(&archive_path).unwrap();
        let dest = tmp.path().join("out");
        let hash = secure_extract_archive(&buffer, &dest).unwrap();
        assert!(hash.is_some());
        assert!(dest.join("pkg-1.0/hello.txt").exists());
    }
}

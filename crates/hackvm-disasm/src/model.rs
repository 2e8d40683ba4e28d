use anyhow::Result;
use std::path::Path;

/// A raw image as loaded at address 0 by the VM.
#[derive(Debug, Clone)]
pub struct Image {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub fn load_raw_bin(path: &Path, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    anyhow::ensure!(payload.len() <= 0x1_0000, "image larger than the 64 KiB address space");
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".into());
    Ok(Image { name, bytes: payload.to_vec() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_applies_skip_and_len() {
        let path = std::env::temp_dir().join(format!("_hackvm_disasm_{}.bin", std::process::id()));
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 2, Some(3)).unwrap();
        assert_eq!(img.bytes, vec![2, 3, 4]);
        assert!(load_raw_bin(&path, 7, None).is_err());
        assert!(load_raw_bin(&path, 2, Some(5)).is_err());
        let _ = std::fs::remove_file(&path);
    }
}

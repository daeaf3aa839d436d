use super::{RangeSource, check_range};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;

/// Local file source with random access support
pub struct LocalFileSource {
    file: std::fs::File,
    size: u64,
}

impl LocalFileSource {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

#[async_trait]
impl RangeSource for LocalFileSource {
    async fn get_range(&self, start: u64, end_inclusive: u64) -> Result<Vec<u8>> {
        check_range(start, end_inclusive, self.size)?;
        let mut buf = vec![0u8; (end_inclusive - start + 1) as usize];

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(&mut buf, start)?;
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut filled = 0;
            while filled < buf.len() {
                let n = self
                    .file
                    .seek_read(&mut buf[filled..], start + filled as u64)?;
                if n == 0 {
                    return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
                }
                filled += n;
            }
        }

        #[cfg(not(any(unix, windows)))]
        {
            use std::io::{Read, Seek, SeekFrom};
            let mut file = &self.file;
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut buf)?;
        }

        Ok(buf)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

//! 单例文件锁
//!
//! 同一时刻只能有一个进程持有执行器的输出线。进程崩溃时操作系统会
//! 自动释放文件锁，不会留下无法清理的残留状态。

use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// 单例文件锁（Drop 时释放）
#[derive(Debug)]
pub struct SingletonLock {
    file: File,
    path: PathBuf,
}

impl SingletonLock {
    /// 尝试获取单例锁（非阻塞）
    ///
    /// 锁已被其他进程持有时返回 `AlreadyExists`。成功后把当前 PID 写入锁文件。
    pub fn try_lock(lock_path: impl AsRef<Path>) -> io::Result<Self> {
        let path = lock_path.as_ref();

        // 拿到锁之前不能截断，文件里可能是正在运行的实例的 PID
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .read(true)
            .open(path)?;

        if !file.try_lock_exclusive()? {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("dispenserd is already running (lock held on {})", path.display()),
            ));
        }

        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        writeln!(&file, "{}", std::process::id())?;
        file.sync_all()?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SingletonLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// 默认锁文件路径
///
/// 优先使用 `XDG_RUNTIME_DIR`，否则使用系统临时目录。
pub fn default_lock_path() -> PathBuf {
    std::env::var_os("XDG_RUNTIME_DIR")
        .map(PathBuf::from)
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(std::env::temp_dir)
        .join("dispenserd.lock")
}

use sqlfs::schema::mode;
use sqlfs::{
    Credentials, Errno, FileSystemOps, FileType, SetAttributes, SetTime, SqlFs, BLOCK_SIZE,
    MAX_FILE_SIZE, ROOT_INO,
};
use std::collections::HashSet;
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn memory_fs() -> SqlFs {
    init_tracing();
    SqlFs::sqlite(":memory:").await.unwrap()
}

async fn file_fs() -> (tempfile::TempDir, SqlFs) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fs.db");
    let fs = SqlFs::sqlite(path.to_str().unwrap()).await.unwrap();
    (dir, fs)
}

fn creds() -> Credentials {
    Credentials { uid: 1000, gid: 1000 }
}

fn pattern(len: usize) -> Vec<u8> {
    b"0123456789abcdef".iter().copied().cycle().take(len).collect()
}

#[tokio::test]
async fn test_create_then_lookup_returns_same_inode() {
    let fs = memory_fs().await;

    let created = fs.create(&creds(), ROOT_INO, "file", 0o644).await.unwrap();
    let found = fs.lookup(ROOT_INO, "file").await.unwrap();

    assert_eq!(found.ino, created.ino);
    assert_eq!(found.kind, FileType::RegularFile);
    assert_eq!(found.perm, 0o644);
    assert_eq!((found.uid, found.gid), (1000, 1000));
    assert_eq!(found.nlink, 1);
}

#[tokio::test]
async fn test_root_attributes() {
    let fs = memory_fs().await;

    let root = fs.getattr(ROOT_INO).await.unwrap();
    assert_eq!(root.kind, FileType::Directory);
    assert_eq!(root.nlink, 2);
    assert!(fs.readdir(ROOT_INO).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lookup_errors() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();

    assert_eq!(fs.lookup(ROOT_INO, "absent").await, Err(Errno::NotFound));
    // lookup inside a regular file is a type mismatch, reported as EIO
    assert_eq!(fs.lookup(file.ino, "x").await, Err(Errno::Io));
    assert_eq!(fs.readdir(file.ino).await, Err(Errno::Io));
    assert_eq!(fs.getattr(9999).await, Err(Errno::NotFound));
}

#[tokio::test]
async fn test_duplicate_create_is_already_exists() {
    let fs = memory_fs().await;

    fs.create(&creds(), ROOT_INO, "dup", 0o644).await.unwrap();
    assert_eq!(
        fs.create(&creds(), ROOT_INO, "dup", 0o644).await,
        Err(Errno::AlreadyExists)
    );
    assert_eq!(
        fs.mkdir(&creds(), ROOT_INO, "dup", 0o755).await,
        Err(Errno::AlreadyExists)
    );
    assert_eq!(fs.readdir(ROOT_INO).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_names_rejected() {
    let fs = memory_fs().await;

    for name in ["", ".", "..", "a/b"] {
        assert_eq!(
            fs.create(&creds(), ROOT_INO, name, 0o644).await,
            Err(Errno::InvalidArgument),
            "name {:?}",
            name
        );
    }
}

#[tokio::test]
async fn test_write_read_roundtrip_at_chunk_boundaries() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "data", 0o644).await.unwrap();

    for len in [0, BLOCK_SIZE, BLOCK_SIZE + 1, 3 * BLOCK_SIZE + 7] {
        fs.setattr(
            file.ino,
            &SetAttributes {
                size: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let content = pattern(len);
        let written = fs.write(file.ino, 0, &content).await.unwrap();
        assert_eq!(written as usize, len);

        let attr = fs.getattr(file.ino).await.unwrap();
        assert_eq!(attr.size, len as u64);
        assert_eq!(fs.read(file.ino, 0, len as u32 + 100).await.unwrap(), content);
    }
}

#[tokio::test]
async fn test_large_file_scenario() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "x", 0o644).await.unwrap();

    let content = pattern(3 * BLOCK_SIZE + 7);
    fs.write(file.ino, 0, &content).await.unwrap();

    let back = fs.read(file.ino, 0, content.len() as u32).await.unwrap();
    assert_eq!(back, content);

    let stats = fs.statfs().await.unwrap();
    assert_eq!(stats.blocks, 4);
    assert_eq!(stats.block_size, BLOCK_SIZE as u32);
}

#[tokio::test]
async fn test_offset_reads_and_writes() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();

    fs.write(file.ino, 0, b"hello world").await.unwrap();
    assert_eq!(fs.read(file.ino, 6, 5).await.unwrap(), b"world");
    assert_eq!(fs.read(file.ino, 6, 100).await.unwrap(), b"world");
    assert!(fs.read(file.ino, 11, 10).await.unwrap().is_empty());
    assert!(fs.read(file.ino, 500, 10).await.unwrap().is_empty());

    // overwrite in the middle keeps the rest
    fs.write(file.ino, 0, b"HELLO").await.unwrap();
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"HELLO world");

    // a write past EOF zero-fills the gap
    fs.write(file.ino, 13, b"!").await.unwrap();
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"HELLO world\0\0!");
    assert_eq!(fs.getattr(file.ino).await.unwrap().size, 14);
}

#[tokio::test]
async fn test_oversized_writes_rejected() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();
    fs.write(file.ino, 0, b"abc").await.unwrap();

    assert_eq!(
        fs.write(file.ino, u64::MAX / 2, b"x").await,
        Err(Errno::InvalidArgument)
    );
    assert_eq!(
        fs.write(file.ino, u64::MAX, b"x").await,
        Err(Errno::InvalidArgument)
    );
    assert_eq!(
        fs.write(file.ino, MAX_FILE_SIZE, b"x").await,
        Err(Errno::InvalidArgument)
    );
    assert_eq!(
        fs.setattr(
            file.ino,
            &SetAttributes {
                size: Some(MAX_FILE_SIZE + 1),
                ..Default::default()
            }
        )
        .await,
        Err(Errno::InvalidArgument)
    );

    let attr = fs.getattr(file.ino).await.unwrap();
    assert_eq!(attr.size, 3);
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"abc");
}

#[tokio::test]
async fn test_zero_length_write_leaves_file_unchanged() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();
    fs.write(file.ino, 0, b"abc").await.unwrap();

    assert_eq!(fs.write(file.ino, 100, b"").await, Ok(0));
    assert_eq!(fs.getattr(file.ino).await.unwrap().size, 3);
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"abc");

    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    assert_eq!(fs.write(dir.ino, 0, b"").await, Err(Errno::Io));
}

#[tokio::test]
async fn test_read_write_on_directory_is_io_error() {
    let fs = memory_fs().await;
    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();

    assert_eq!(fs.write(dir.ino, 0, b"x").await, Err(Errno::Io));
    assert_eq!(fs.read(dir.ino, 0, 1).await, Err(Errno::Io));
    assert_eq!(fs.readlink(dir.ino).await, Err(Errno::Io));
}

#[tokio::test]
async fn test_rmdir_non_empty_leaves_tree_unchanged() {
    let fs = memory_fs().await;
    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    let child = fs.create(&creds(), dir.ino, "child", 0o644).await.unwrap();

    assert_eq!(fs.rmdir(ROOT_INO, "d").await, Err(Errno::DirectoryNotEmpty));

    assert_eq!(fs.lookup(ROOT_INO, "d").await.unwrap().ino, dir.ino);
    assert_eq!(fs.lookup(dir.ino, "child").await.unwrap().ino, child.ino);

    fs.unlink(dir.ino, "child").await.unwrap();
    fs.rmdir(ROOT_INO, "d").await.unwrap();
    assert_eq!(fs.lookup(ROOT_INO, "d").await, Err(Errno::NotFound));
    assert_eq!(fs.getattr(dir.ino).await, Err(Errno::NotFound));
}

#[tokio::test]
async fn test_unlink_rmdir_type_checks() {
    let fs = memory_fs().await;
    fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();

    assert_eq!(fs.unlink(ROOT_INO, "d").await, Err(Errno::Io));
    assert_eq!(fs.rmdir(ROOT_INO, "f").await, Err(Errno::Io));
    assert_eq!(fs.unlink(ROOT_INO, "missing").await, Err(Errno::NotFound));
}

#[tokio::test]
async fn test_last_unlink_purges_node_and_blocks() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();
    fs.write(file.ino, 0, &pattern(2 * BLOCK_SIZE)).await.unwrap();

    let before = fs.statfs().await.unwrap();
    assert_eq!(before.blocks, 2);
    assert_eq!(before.files, 2);

    fs.unlink(ROOT_INO, "f").await.unwrap();

    let after = fs.statfs().await.unwrap();
    assert_eq!(after.blocks, 0);
    assert_eq!(after.files, 1);
    assert_eq!(fs.getattr(file.ino).await, Err(Errno::NotFound));
}

#[tokio::test]
async fn test_hard_links() {
    let fs = memory_fs().await;
    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    let file = fs.create(&creds(), ROOT_INO, "orig", 0o644).await.unwrap();
    fs.write(file.ino, 0, b"shared").await.unwrap();

    let linked = fs.link(file.ino, dir.ino, "alias").await.unwrap();
    assert_eq!(linked.ino, file.ino);
    assert_eq!(linked.nlink, 2);
    assert_eq!(fs.lookup(dir.ino, "alias").await.unwrap().ino, file.ino);

    assert_eq!(
        fs.link(file.ino, ROOT_INO, "orig").await,
        Err(Errno::AlreadyExists)
    );
    // no hard links to directories
    assert_eq!(fs.link(dir.ino, ROOT_INO, "d2").await, Err(Errno::Io));

    fs.unlink(ROOT_INO, "orig").await.unwrap();
    let survivor = fs.getattr(file.ino).await.unwrap();
    assert_eq!(survivor.nlink, 1);
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"shared");

    fs.unlink(dir.ino, "alias").await.unwrap();
    assert_eq!(fs.getattr(file.ino).await, Err(Errno::NotFound));
    assert_eq!(fs.statfs().await.unwrap().blocks, 0);
}

#[tokio::test]
async fn test_create_write_rename_scenario() {
    let fs = memory_fs().await;

    let a = fs.mkdir(&creds(), ROOT_INO, "a", 0o755).await.unwrap();
    let b = fs.create(&creds(), a.ino, "b", 0o644).await.unwrap();
    fs.write(b.ino, 0, b"hello").await.unwrap();
    assert_eq!(fs.read(b.ino, 0, 5).await.unwrap(), b"hello");

    fs.rename(a.ino, "b", a.ino, "c").await.unwrap();

    assert_eq!(fs.lookup(a.ino, "b").await, Err(Errno::NotFound));
    let c = fs.lookup(a.ino, "c").await.unwrap();
    assert_eq!(c.ino, b.ino);
    assert_eq!(fs.read(c.ino, 0, 5).await.unwrap(), b"hello");
}

#[tokio::test]
async fn test_rename_across_directories() {
    let fs = memory_fs().await;
    let src = fs.mkdir(&creds(), ROOT_INO, "src", 0o755).await.unwrap();
    let dst = fs.mkdir(&creds(), ROOT_INO, "dst", 0o755).await.unwrap();
    let file = fs.create(&creds(), src.ino, "f", 0o644).await.unwrap();

    fs.rename(src.ino, "f", dst.ino, "g").await.unwrap();

    assert!(fs.readdir(src.ino).await.unwrap().is_empty());
    let entries = fs.readdir(dst.ino).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "g");
    assert_eq!(entries[0].inode, file.ino);

    assert_eq!(
        fs.rename(src.ino, "f", dst.ino, "h").await,
        Err(Errno::NotFound)
    );
}

#[tokio::test]
async fn test_rename_replaces_existing_file() {
    let fs = memory_fs().await;
    let old = fs.create(&creds(), ROOT_INO, "old", 0o644).await.unwrap();
    let new = fs.create(&creds(), ROOT_INO, "new", 0o644).await.unwrap();
    fs.write(old.ino, 0, b"old data").await.unwrap();
    fs.write(new.ino, 0, b"new data").await.unwrap();

    fs.rename(ROOT_INO, "new", ROOT_INO, "old").await.unwrap();

    let current = fs.lookup(ROOT_INO, "old").await.unwrap();
    assert_eq!(current.ino, new.ino);
    assert_eq!(fs.read(current.ino, 0, 64).await.unwrap(), b"new data");
    assert_eq!(fs.lookup(ROOT_INO, "new").await, Err(Errno::NotFound));
    // the replaced file had one link, so it is gone with its content
    assert_eq!(fs.getattr(old.ino).await, Err(Errno::NotFound));
    assert_eq!(fs.statfs().await.unwrap().blocks, 1);
}

#[tokio::test]
async fn test_rename_directory_rules() {
    let fs = memory_fs().await;
    let a = fs.mkdir(&creds(), ROOT_INO, "a", 0o755).await.unwrap();
    let inner = fs.mkdir(&creds(), a.ino, "inner", 0o755).await.unwrap();
    let full = fs.mkdir(&creds(), ROOT_INO, "full", 0o755).await.unwrap();
    fs.create(&creds(), full.ino, "x", 0o644).await.unwrap();
    fs.create(&creds(), ROOT_INO, "file", 0o644).await.unwrap();
    let empty = fs.mkdir(&creds(), ROOT_INO, "empty", 0o755).await.unwrap();

    // into its own subtree
    assert_eq!(
        fs.rename(ROOT_INO, "a", inner.ino, "a2").await,
        Err(Errno::InvalidArgument)
    );
    assert_eq!(
        fs.rename(ROOT_INO, "a", a.ino, "self").await,
        Err(Errno::InvalidArgument)
    );
    // directory over a non-empty directory
    assert_eq!(
        fs.rename(ROOT_INO, "a", ROOT_INO, "full").await,
        Err(Errno::DirectoryNotEmpty)
    );
    // directory over a file and file over a directory
    assert_eq!(fs.rename(ROOT_INO, "a", ROOT_INO, "file").await, Err(Errno::Io));
    assert_eq!(fs.rename(ROOT_INO, "file", ROOT_INO, "a").await, Err(Errno::Io));

    // directory over an empty directory replaces it
    fs.rename(ROOT_INO, "a", ROOT_INO, "empty").await.unwrap();
    assert_eq!(fs.lookup(ROOT_INO, "empty").await.unwrap().ino, a.ino);
    assert_eq!(fs.getattr(empty.ino).await, Err(Errno::NotFound));
    assert_eq!(fs.lookup(a.ino, "inner").await.unwrap().ino, inner.ino);
}

#[tokio::test]
async fn test_rename_between_hard_links_is_noop() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "one", 0o644).await.unwrap();
    fs.link(file.ino, ROOT_INO, "two").await.unwrap();

    fs.rename(ROOT_INO, "one", ROOT_INO, "two").await.unwrap();

    assert_eq!(fs.lookup(ROOT_INO, "one").await.unwrap().ino, file.ino);
    assert_eq!(fs.lookup(ROOT_INO, "two").await.unwrap().ino, file.ino);
    assert_eq!(fs.getattr(file.ino).await.unwrap().nlink, 2);
}

#[tokio::test]
async fn test_symlink_and_special_nodes() {
    let fs = memory_fs().await;

    let link = fs
        .symlink(&creds(), ROOT_INO, "link", "/some/target")
        .await
        .unwrap();
    assert_eq!(link.kind, FileType::Symlink);
    assert_eq!(link.size, "/some/target".len() as u64);
    assert_eq!(fs.readlink(link.ino).await.unwrap(), "/some/target");

    let fifo = fs
        .mknod(&creds(), ROOT_INO, "pipe", mode::S_IFIFO | 0o600, 0)
        .await
        .unwrap();
    assert_eq!(fifo.kind, FileType::NamedPipe);
    assert_eq!(fifo.perm, 0o600);

    let dev = fs
        .mknod(&creds(), ROOT_INO, "sda", mode::S_IFBLK | 0o660, 0x0800)
        .await
        .unwrap();
    assert_eq!(dev.kind, FileType::BlockDevice);
    assert_eq!(dev.rdev, 0x0800);

    let mut kinds: Vec<_> = fs
        .readdir(ROOT_INO)
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.name, e.kind))
        .collect();
    kinds.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        kinds,
        vec![
            ("link".to_string(), FileType::Symlink),
            ("pipe".to_string(), FileType::NamedPipe),
            ("sda".to_string(), FileType::BlockDevice),
        ]
    );

    assert_eq!(fs.readlink(fifo.ino).await, Err(Errno::Io));
    assert_eq!(fs.write(fifo.ino, 0, b"x").await, Err(Errno::Io));
}

#[tokio::test]
async fn test_setattr() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();
    fs.write(file.ino, 0, b"0123456789").await.unwrap();

    let stamp = chrono::DateTime::from_timestamp(1_000_000, 0).unwrap();
    let attr = fs
        .setattr(
            file.ino,
            &SetAttributes {
                mode: Some(0o100600),
                uid: Some(0),
                gid: Some(42),
                size: Some(4),
                mtime: Some(SetTime::At(stamp)),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(attr.perm, 0o600);
    assert_eq!(attr.kind, FileType::RegularFile);
    assert_eq!((attr.uid, attr.gid), (0, 42));
    assert_eq!(attr.size, 4);
    assert_eq!(attr.mtime, stamp);
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"0123");

    let grown = fs
        .setattr(
            file.ino,
            &SetAttributes {
                size: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(grown.size, 6);
    assert_eq!(fs.read(file.ino, 0, 64).await.unwrap(), b"0123\0\0");

    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    assert_eq!(
        fs.setattr(
            dir.ino,
            &SetAttributes {
                size: Some(0),
                ..Default::default()
            }
        )
        .await,
        Err(Errno::Io)
    );
}

#[tokio::test]
async fn test_statfs_counts() {
    let fs = memory_fs().await;

    let empty = fs.statfs().await.unwrap();
    assert_eq!(empty.files, 1);
    assert_eq!(empty.blocks, 0);
    assert_eq!(empty.blocks_free, 0);
    assert_eq!(empty.files_free, 0);
    assert_eq!(empty.fragment_size, empty.block_size);

    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap();
    let file = fs.create(&creds(), dir.ino, "f", 0o644).await.unwrap();
    fs.write(file.ino, 0, &pattern(BLOCK_SIZE + 1)).await.unwrap();

    let stats = fs.statfs().await.unwrap();
    assert_eq!(stats.files, 3);
    assert_eq!(stats.blocks, 2);
}

#[tokio::test]
async fn test_link_count_matches_tree_entries() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f0", 0o644).await.unwrap();

    for i in 1..5 {
        let attr = fs.link(file.ino, ROOT_INO, &format!("f{}", i)).await.unwrap();
        assert_eq!(attr.nlink, i + 1);
    }
    for i in 0..4 {
        fs.unlink(ROOT_INO, &format!("f{}", i)).await.unwrap();
        let entries = fs
            .readdir(ROOT_INO)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.inode == file.ino)
            .count();
        assert_eq!(fs.getattr(file.ino).await.unwrap().nlink as usize, entries);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_in_one_directory() {
    let (_tmp, fs) = file_fs().await;
    let fs = Arc::new(fs);
    let dir = fs.mkdir(&creds(), ROOT_INO, "d", 0o755).await.unwrap().ino;

    let mut handles = Vec::new();
    for i in 0..16 {
        let fs = fs.clone();
        handles.push(tokio::spawn(async move {
            fs.create(&creds(), dir, &format!("file-{}", i), 0o644)
                .await
        }));
    }

    let mut inodes = HashSet::new();
    for handle in handles {
        inodes.insert(handle.await.unwrap().unwrap().ino);
    }
    assert_eq!(inodes.len(), 16);
    assert_eq!(fs.readdir(dir).await.unwrap().len(), 16);
    assert_eq!(fs.statfs().await.unwrap().files, 18);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writes_to_distinct_files() {
    let (_tmp, fs) = file_fs().await;
    let fs = Arc::new(fs);

    let mut files = Vec::new();
    for i in 0..8 {
        let attr = fs
            .create(&creds(), ROOT_INO, &format!("w-{}", i), 0o644)
            .await
            .unwrap();
        files.push(attr.ino);
    }

    let mut handles = Vec::new();
    for (i, ino) in files.iter().copied().enumerate() {
        let fs = fs.clone();
        handles.push(tokio::spawn(async move {
            fs.write(ino, 0, &vec![i as u8; BLOCK_SIZE + i]).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for (i, ino) in files.into_iter().enumerate() {
        let data = fs.read(ino, 0, 4 * BLOCK_SIZE as u32).await.unwrap();
        assert_eq!(data, vec![i as u8; BLOCK_SIZE + i]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_same_name_single_winner() {
    let (_tmp, fs) = file_fs().await;
    let fs = Arc::new(fs);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let fs = fs.clone();
        handles.push(tokio::spawn(async move {
            fs.create(&creds(), ROOT_INO, "contended", 0o644).await
        }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e, Errno::AlreadyExists),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(fs.readdir(ROOT_INO).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_fsync() {
    let fs = memory_fs().await;
    let file = fs.create(&creds(), ROOT_INO, "f", 0o644).await.unwrap();

    assert_eq!(fs.fsync(file.ino).await, Ok(()));
    assert_eq!(fs.fsync(12345).await, Err(Errno::NotFound));
}

#[tokio::test]
async fn test_file_backed_store_persists_across_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fs.db");
    let path = path.to_str().unwrap().to_string();

    let ino = {
        let fs = SqlFs::sqlite(path.clone()).await.unwrap();
        let docs = fs.mkdir(&creds(), ROOT_INO, "docs", 0o755).await.unwrap();
        let file = fs.create(&creds(), docs.ino, "note", 0o644).await.unwrap();
        fs.write(file.ino, 0, b"persisted").await.unwrap();
        fs.backend().close().await;
        file.ino
    };

    let fs = SqlFs::sqlite(path).await.unwrap();
    let docs = fs.lookup(ROOT_INO, "docs").await.unwrap();
    let note = fs.lookup(docs.ino, "note").await.unwrap();
    assert_eq!(note.ino, ino);
    assert_eq!(fs.read(note.ino, 0, 64).await.unwrap(), b"persisted");

    // the inode sequence keeps counting from where it stopped
    let fresh = fs.create(&creds(), ROOT_INO, "fresh", 0o644).await.unwrap();
    assert!(fresh.ino > ino);
}

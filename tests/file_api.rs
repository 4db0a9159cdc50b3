use bfs::{BlockDevice, FileDisk, FileSystem, FsError, Geometry, MemDisk, Whence};

/// 8-byte blocks make block boundaries easy to hit.
fn tiny_geometry() -> Geometry {
    Geometry {
        block_size: 8,
        block_count: 512,
        inode_count: 4,
        dir_capacity: 4,
        max_file_blocks: 32,
        max_name_len: 12,
    }
}

fn tiny() -> FileSystem<MemDisk> {
    let g = tiny_geometry();
    FileSystem::format(MemDisk::new(g.block_size, g.block_count), g).unwrap()
}

fn default_volume() -> FileSystem<MemDisk> {
    let g = Geometry::default();
    FileSystem::format(MemDisk::new(g.block_size, g.block_count), g).unwrap()
}

#[test]
fn write_seek_read_round_trip() {
    let mut fs = default_volume();
    let content: Vec<u8> = (0..3000u32).map(|i| (i * 7 % 251) as u8).collect();

    let fd = fs.create("data").unwrap();
    assert_eq!(fs.write(fd, &content).unwrap(), content.len());
    assert_eq!(fs.tell(fd).unwrap(), 3000);
    assert_eq!(fs.size(fd).unwrap(), 3000);

    fs.seek(fd, 0, Whence::Set).unwrap();
    let mut back = vec![0u8; content.len()];
    assert_eq!(fs.read(fd, &mut back).unwrap(), content.len());
    assert_eq!(back, content);
}

#[test]
fn create_existing_truncates() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"some old content").unwrap();
    fs.close(fd).unwrap();
    let free = fs.usage().free_blocks;

    let fd = fs.create("f").unwrap();
    assert_eq!(fs.size(fd).unwrap(), 0);
    let mut buf = [0u8; 16];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    assert_eq!(fs.usage().free_blocks, free + 2);
    assert_eq!(fs.list().unwrap().len(), 1);
}

#[test]
fn short_read_only_at_end_of_file() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"0123456789").unwrap();
    fs.seek(fd, 0, Whence::Set).unwrap();

    let mut buf = [0u8; 4];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 4);
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 4);
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 2);
    assert_eq!(&buf[..2], b"89");
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 0);
    assert_eq!(fs.tell(fd).unwrap(), 10);
}

#[test]
fn read_never_exceeds_request() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, &[9u8; 40]).unwrap();
    fs.seek(fd, 3, Whence::Set).unwrap();

    let mut buf = [0u8; 40];
    assert_eq!(fs.read(fd, &mut buf[..5]).unwrap(), 5);
    assert_eq!(buf[5], 0);
    assert_eq!(fs.tell(fd).unwrap(), 8);
}

#[test]
fn seek_end_then_tell_is_size() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"hello, block world").unwrap();
    fs.seek(fd, 0, Whence::Set).unwrap();

    fs.seek(fd, 0, Whence::End).unwrap();
    assert_eq!(fs.tell(fd).unwrap(), fs.size(fd).unwrap());
}

#[test]
fn negative_seek_offset_is_fatal_for_every_origin() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"0123456789").unwrap();

    for whence in [Whence::Set, Whence::Cur, Whence::End] {
        let err = fs.seek(fd, -1, whence).unwrap_err();
        assert!(matches!(err, FsError::NegativeOffset(-1)));
        assert!(err.is_fatal());
    }
    assert_eq!(fs.tell(fd).unwrap(), 10);
}

#[test]
fn unknown_origin_is_fatal() {
    let err = Whence::try_from(7i32).unwrap_err();
    assert!(matches!(err, FsError::BadWhence(7)));
    assert!(err.is_fatal());
}

#[test]
fn write_across_block_boundary_keeps_neighbours() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"AAAAAAAABBBBBBBBCCCCCCCC").unwrap();

    // 10 bytes starting 2 bytes before the end of block 0
    fs.seek(fd, 6, Whence::Set).unwrap();
    fs.write(fd, b"0123456789").unwrap();
    assert_eq!(fs.tell(fd).unwrap(), 16);
    assert_eq!(fs.size(fd).unwrap(), 24);

    fs.seek(fd, 0, Whence::Set).unwrap();
    let mut buf = [0u8; 24];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 24);
    assert_eq!(&buf, b"AAAAAA0123456789CCCCCCCC");
}

#[test]
fn write_extends_across_new_blocks() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"xyz").unwrap();

    fs.seek(fd, 6, Whence::Set).unwrap();
    fs.write(fd, b"0123456789").unwrap();
    assert_eq!(fs.size(fd).unwrap(), 16);
    assert_eq!(fs.stat("f").unwrap().blocks, 2);

    fs.seek(fd, 0, Whence::Set).unwrap();
    let mut buf = [0u8; 16];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(&buf, b"xyz\0\0\x000123456789");
}

#[test]
fn two_opens_have_independent_cursors() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.write(fd, b"abcdefghij").unwrap();
    fs.close(fd).unwrap();

    let a = fs.open("f").unwrap();
    let b = fs.open("f").unwrap();
    assert_ne!(a, b);

    let mut buf = [0u8; 4];
    fs.read(a, &mut buf).unwrap();
    assert_eq!(&buf, b"abcd");
    assert_eq!(fs.tell(a).unwrap(), 4);
    assert_eq!(fs.tell(b).unwrap(), 0);

    fs.read(b, &mut buf[..2]).unwrap();
    assert_eq!(&buf[..2], b"ab");
}

#[test]
fn open_file_table_exhaustion_is_fatal() {
    let mut fs = tiny().with_open_file_limit(3);
    let fd = fs.create("f").unwrap();
    fs.open("f").unwrap();
    fs.open("f").unwrap();

    let err = fs.open("f").unwrap_err();
    assert!(matches!(err, FsError::OpenTableFull(3)));
    assert!(err.is_fatal());

    fs.close(fd).unwrap();
    assert_eq!(fs.open("f").unwrap(), fd);
}

#[test]
fn closed_descriptor_is_rejected() {
    let mut fs = tiny();
    let fd = fs.create("f").unwrap();
    fs.close(fd).unwrap();

    let mut buf = [0u8; 1];
    assert!(matches!(fs.read(fd, &mut buf), Err(FsError::BadDescriptor(_))));
    assert!(matches!(fs.write(fd, b"x"), Err(FsError::BadDescriptor(_))));
    assert!(fs.seek(fd, 0, Whence::Set).is_err());
    assert!(fs.close(fd).is_err());
}

#[test]
fn contents_survive_remount() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bfs.img");
    let g = tiny_geometry();

    let disk = FileDisk::create(&path, g.block_size, g.block_count).unwrap();
    let mut fs = FileSystem::format(disk, g).unwrap();
    let fd = fs.create("notes").unwrap();
    fs.write(fd, b"persisted across blocks").unwrap();
    let fd2 = fs.create("other").unwrap();
    fs.write(fd2, b"z").unwrap();
    fs.remove("other").unwrap_err();
    drop(fs);

    let mut fs = FileSystem::mount(FileDisk::open(&path).unwrap()).unwrap();
    let names: Vec<_> = fs.list().unwrap().into_iter().map(|f| f.name).collect();
    assert_eq!(names, ["notes", "other"]);

    let fd = fs.open("notes").unwrap();
    assert_eq!(fs.tell(fd).unwrap(), 0);
    let mut buf = vec![0u8; fs.size(fd).unwrap() as usize];
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(buf, b"persisted across blocks");

    // allocation state was persisted too: new blocks do not collide
    let fd = fs.create("third").unwrap();
    fs.write(fd, &[1u8; 20]).unwrap();
    let fd = fs.open("notes").unwrap();
    fs.read(fd, &mut buf).unwrap();
    assert_eq!(buf, b"persisted across blocks");
}

#[test]
fn remount_takes_block_size_from_the_volume() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big-blocks.img");
    let g = Geometry::new(1024, 128);

    let mut fs = FileSystem::format(FileDisk::create(&path, 1024, 128).unwrap(), g).unwrap();
    let fd = fs.create("wide").unwrap();
    fs.write(fd, &[5u8; 1500]).unwrap();
    drop(fs);

    let disk = FileDisk::open(&path).unwrap();
    assert_eq!(disk.block_size(), 1024);
    assert_eq!(disk.block_count(), 128);

    let mut fs = FileSystem::mount(disk).unwrap();
    assert_eq!(fs.geometry().block_size, 1024);
    assert_eq!(fs.stat("wide").unwrap().blocks, 2);
    let fd = fs.open("wide").unwrap();
    let mut buf = vec![0u8; 1500];
    assert_eq!(fs.read(fd, &mut buf).unwrap(), 1500);
    assert!(buf.iter().all(|&b| b == 5));
}

#[test]
fn mount_missing_image_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = FileDisk::open(dir.path().join("missing.img")).unwrap_err();
    assert!(matches!(err, FsError::NoDisk(_)));
    assert!(err.is_fatal());
}

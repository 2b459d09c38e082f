//! Persistent node state: fixed byte layout over a [`Store`] capability.
//!
//! The layout mirrors the EEPROM map of the target hardware:
//!
//! | Offset | Length | Contents |
//! |---|---|---|
//! | 0 | 1 | node id |
//! | 1 | 1 | parent node id |
//! | 2 | 1 | distance |
//! | 3 | 8 | firmware descriptor |
//! | 11 | 256 | child-route table |
//! | 267 | 256 | user state |
//!
//! Every write is compared against the stored value first; EEPROM cells
//! endure on the order of 100,000 cycles.

use std::path::{Path, PathBuf};

use sensormesh_core::{FirmwareDescriptor, MemStore, Store};
use sensormesh_routing::constants::ROUTE_TABLE_SIZE;

use crate::error::NodeError;

/// Byte offsets of the persistent layout.
pub mod layout {
    use sensormesh_core::FirmwareDescriptor;
    use sensormesh_routing::constants::ROUTE_TABLE_SIZE;

    pub const NODE_ID: usize = 0;
    pub const PARENT: usize = 1;
    pub const DISTANCE: usize = 2;
    pub const FIRMWARE_CONFIG: usize = 3;
    pub const ROUTES: usize = FIRMWARE_CONFIG + FirmwareDescriptor::WIRE_SIZE;
    pub const LOCAL_CONFIG: usize = ROUTES + ROUTE_TABLE_SIZE;
    pub const TOTAL: usize = LOCAL_CONFIG + 256;
}

/// Typed accessors over the raw byte layout.
///
/// All mutations go through here so nothing can forget the write-through;
/// unchanged values are never rewritten.
pub struct NodeStore<S: Store> {
    store: S,
}

impl<S: Store> NodeStore<S> {
    pub fn new(store: S) -> Self {
        NodeStore { store }
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    pub fn node_id(&self) -> u8 {
        self.store.read_byte(layout::NODE_ID)
    }

    pub fn set_node_id(&mut self, id: u8) {
        self.write_byte_if_changed(layout::NODE_ID, id);
    }

    pub fn parent(&self) -> u8 {
        self.store.read_byte(layout::PARENT)
    }

    pub fn set_parent(&mut self, parent: u8) {
        self.write_byte_if_changed(layout::PARENT, parent);
    }

    pub fn distance(&self) -> u8 {
        self.store.read_byte(layout::DISTANCE)
    }

    pub fn set_distance(&mut self, distance: u8) {
        self.write_byte_if_changed(layout::DISTANCE, distance);
    }

    pub fn firmware_descriptor(&self) -> FirmwareDescriptor {
        let mut bytes = [0u8; FirmwareDescriptor::WIRE_SIZE];
        self.store.read(layout::FIRMWARE_CONFIG, &mut bytes);
        // The fixed-size read cannot fail to parse.
        FirmwareDescriptor::from_bytes(&bytes).expect("descriptor size is fixed")
    }

    pub fn set_firmware_descriptor(&mut self, descriptor: FirmwareDescriptor) {
        for (i, byte) in descriptor.to_bytes().iter().enumerate() {
            self.write_byte_if_changed(layout::FIRMWARE_CONFIG + i, *byte);
        }
    }

    pub fn routes_image(&self) -> [u8; ROUTE_TABLE_SIZE] {
        let mut image = [0xFFu8; ROUTE_TABLE_SIZE];
        self.store.read(layout::ROUTES, &mut image);
        image
    }

    pub fn set_route(&mut self, child: u8, via: u8) {
        self.write_byte_if_changed(layout::ROUTES + child as usize, via);
    }

    /// Persist one byte of user state (positions 0..=255).
    pub fn save_state(&mut self, pos: u8, value: u8) {
        self.write_byte_if_changed(layout::LOCAL_CONFIG + pos as usize, value);
    }

    /// Read one byte of user state.
    pub fn load_state(&self, pos: u8) -> u8 {
        self.store.read_byte(layout::LOCAL_CONFIG + pos as usize)
    }

    fn write_byte_if_changed(&mut self, addr: usize, value: u8) {
        if self.store.read_byte(addr) != value {
            self.store.write_byte(addr, value);
        }
    }
}

/// A file-backed store holding the whole persistent image in RAM and
/// rewriting the file atomically (write `.tmp`, rename) on every change.
pub struct FileStore {
    path: PathBuf,
    image: MemStore,
}

impl FileStore {
    /// Open or create the backing file, sized to the persistent layout.
    pub fn open(path: &Path) -> Result<Self, NodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut image = MemStore::new(layout::TOTAL);
        match std::fs::read(path) {
            Ok(bytes) => {
                if bytes.len() != layout::TOTAL {
                    return Err(NodeError::Storage(format!(
                        "backing file {} has {} bytes, expected {}",
                        path.display(),
                        bytes.len(),
                        layout::TOTAL
                    )));
                }
                image.write(0, &bytes);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(NodeError::Io(e)),
        }
        Ok(FileStore {
            path: path.to_path_buf(),
            image,
        })
    }

    fn flush(&self) {
        let tmp = self.path.with_extension("tmp");
        let result = std::fs::write(&tmp, self.image.as_bytes())
            .and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            tracing::warn!("failed to persist node state to {}: {e}", self.path.display());
        }
    }
}

impl Store for FileStore {
    fn read(&self, addr: usize, buf: &mut [u8]) {
        self.image.read(addr, buf);
    }

    fn write(&mut self, addr: usize, data: &[u8]) {
        let before = self.image.write_count();
        self.image.write(addr, data);
        if self.image.write_count() != before {
            self.flush();
        }
    }

    fn capacity(&self) -> usize {
        self.image.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_offsets() {
        assert_eq!(layout::NODE_ID, 0);
        assert_eq!(layout::PARENT, 1);
        assert_eq!(layout::DISTANCE, 2);
        assert_eq!(layout::FIRMWARE_CONFIG, 3);
        assert_eq!(layout::ROUTES, 11);
        assert_eq!(layout::LOCAL_CONFIG, 267);
        assert_eq!(layout::TOTAL, 523);
    }

    #[test]
    fn test_fresh_store_reads_sentinels() {
        let store = NodeStore::new(MemStore::new(layout::TOTAL));
        assert_eq!(store.node_id(), 0xFF);
        assert_eq!(store.parent(), 0xFF);
        assert_eq!(store.distance(), 0xFF);
    }

    #[test]
    fn test_node_config_roundtrip() {
        let mut store = NodeStore::new(MemStore::new(layout::TOTAL));
        store.set_node_id(7);
        store.set_parent(3);
        store.set_distance(2);
        assert_eq!(store.node_id(), 7);
        assert_eq!(store.parent(), 3);
        assert_eq!(store.distance(), 2);
    }

    #[test]
    fn test_firmware_descriptor_roundtrip() {
        let mut store = NodeStore::new(MemStore::new(layout::TOTAL));
        let descriptor = FirmwareDescriptor {
            firmware_type: 1,
            version: 2,
            blocks: 40,
            crc: 0xBBBB,
        };
        store.set_firmware_descriptor(descriptor);
        assert_eq!(store.firmware_descriptor(), descriptor);
    }

    #[test]
    fn test_user_state_roundtrip() {
        let mut store = NodeStore::new(MemStore::new(layout::TOTAL));
        store.save_state(0, 11);
        store.save_state(255, 22);
        assert_eq!(store.load_state(0), 11);
        assert_eq!(store.load_state(255), 22);
        // User state must not clobber the route table.
        assert_eq!(store.routes_image(), [0xFF; ROUTE_TABLE_SIZE]);
    }

    #[test]
    fn test_unchanged_writes_do_not_touch_cells() {
        let mut store = NodeStore::new(MemStore::new(layout::TOTAL));
        store.set_node_id(7);
        store.save_state(4, 9);
        let writes = {
            let inner = store.into_inner();
            let count = inner.write_count();
            store = NodeStore::new(inner);
            count
        };
        store.set_node_id(7);
        store.save_state(4, 9);
        assert_eq!(store.into_inner().write_count(), writes);
    }

    #[test]
    fn test_route_slots_persist() {
        let mut store = NodeStore::new(MemStore::new(layout::TOTAL));
        store.set_route(42, 17);
        let image = store.routes_image();
        assert_eq!(image[42], 17);
        assert_eq!(image[43], 0xFF);
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");

        {
            let mut store = NodeStore::new(FileStore::open(&path).unwrap());
            store.set_node_id(9);
            store.set_route(42, 17);
            store.save_state(3, 0x5A);
        }

        let store = NodeStore::new(FileStore::open(&path).unwrap());
        assert_eq!(store.node_id(), 9);
        assert_eq!(store.routes_image()[42], 17);
        assert_eq!(store.load_state(3), 0x5A);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_file_store_rejects_wrong_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eeprom.bin");
        std::fs::write(&path, b"short").unwrap();
        assert!(matches!(
            FileStore::open(&path),
            Err(NodeError::Storage(_))
        ));
    }

    #[test]
    fn test_file_store_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("eeprom.bin");
        let mut store = FileStore::open(&path).unwrap();
        store.write_byte(0, 1);
        assert!(path.exists());
    }
}

use std::convert::TryFrom;

use thiserror::Error;

use crate::reader::PatchRecord;

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("target address {address:#x} is outside this process's address range")]
    AddressOutOfRange { address: i64 },
    #[error("cannot make {length} bytes at {address:#x} writable")]
    Unmapped {
        address: usize,
        length: usize,
        #[source]
        source: region::Error,
    },
}

pub fn apply(record: &PatchRecord) -> Result<(), ApplyError> {
    let address = usize::try_from(record.address)
        .map_err(|_| ApplyError::AddressOutOfRange {
            address: record.address,
        })?;
    if record.payload.is_empty() {
        return Ok(());
    }
    unsafe { patch_bytes(address as *mut u8, &record.payload) }
}

// The guard restores the prior page protections when it drops, so every exit
// path leaves the region exactly as permissive as it was found.
unsafe fn patch_bytes(dst: *mut u8, src: &[u8]) -> Result<(), ApplyError> {
    let _guard = region::protect_with_handle(dst, src.len(), region::Protection::READ_WRITE)
        .map_err(|source| ApplyError::Unmapped {
            address: dst as usize,
            length: src.len(),
            source,
        })?;
    std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_payload_at_exact_range() {
        let mut buf = vec![0u8; 8];
        let record = PatchRecord {
            address: buf.as_mut_ptr() as i64,
            payload: vec![1, 2, 3],
        };

        apply(&record).unwrap();
        assert_eq!(buf, [1, 2, 3, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn empty_payload_succeeds_without_touching_memory() {
        let mut buf = vec![9u8; 4];
        let record = PatchRecord {
            address: buf.as_mut_ptr() as i64,
            payload: Vec::new(),
        };

        apply(&record).unwrap();
        assert_eq!(buf, [9, 9, 9, 9]);
    }

    #[test]
    fn kernel_space_address_is_out_of_range() {
        let record = PatchRecord {
            address: -8,
            payload: vec![0],
        };

        match apply(&record) {
            Err(ApplyError::AddressOutOfRange { address: -8 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unreachable_page_is_reported() {
        // the first page is never mapped in a user process
        let record = PatchRecord {
            address: 0x8,
            payload: vec![1, 2, 3],
        };

        match apply(&record) {
            Err(ApplyError::Unmapped { address: 0x8, length: 3, .. }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn protection_is_restored_after_apply() {
        let page = region::page::size();
        let mut backing = vec![0u8; page * 2];
        let target = {
            let base = backing.as_mut_ptr() as usize;
            ((base + page - 1) & !(page - 1)) as *mut u8
        };

        unsafe { region::protect(target, page, region::Protection::READ).unwrap() };
        assert_eq!(
            region::query(target).unwrap().protection,
            region::Protection::READ
        );

        let record = PatchRecord {
            address: target as i64,
            payload: vec![0xaa; 16],
        };
        apply(&record).unwrap();

        unsafe {
            assert_eq!(std::ptr::read_volatile(target), 0xaa);
            assert_eq!(std::ptr::read_volatile(target.add(15)), 0xaa);
        }
        assert_eq!(
            region::query(target).unwrap().protection,
            region::Protection::READ
        );

        // the allocator writes into freed chunks; hand the page back first
        unsafe { region::protect(target, page, region::Protection::READ_WRITE).unwrap() };
    }
}

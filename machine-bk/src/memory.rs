//! The memory map: address routing to RAM, ROM, and devices.
//!
//! The flat 16-bit space is partitioned into non-overlapping regions kept
//! sorted by start address; lookup is a binary search. Device claims are a
//! separate per-word-address table checked first, so the I/O page needs no
//! backing region. Anything unclaimed is a bus error.

use bk_core::Cycles;
use cpu_k1801::bus::{Bus, BusError};
use std::collections::BTreeMap;

use crate::device::Device;

/// A contiguous RAM or ROM region.
pub enum MemoryRegion {
    Ram { start: u16, data: Vec<u8> },
    Rom { start: u16, data: Vec<u8> },
}

impl MemoryRegion {
    /// Zero-filled RAM.
    #[must_use]
    pub fn ram(start: u16, len: usize) -> Self {
        Self::Ram {
            start,
            data: vec![0; len],
        }
    }

    /// ROM initialized from words (the natural unit for machine images).
    #[must_use]
    pub fn rom_from_words(start: u16, words: &[u16]) -> Self {
        let mut data = Vec::with_capacity(words.len() * 2);
        for &word in words {
            data.push(word as u8);
            data.push((word >> 8) as u8);
        }
        Self::Rom { start, data }
    }

    /// ROM initialized from raw bytes (a loaded image file).
    #[must_use]
    pub fn rom_from_bytes(start: u16, bytes: &[u8]) -> Self {
        Self::Rom {
            start,
            data: bytes.to_vec(),
        }
    }

    #[must_use]
    pub fn start(&self) -> u16 {
        match self {
            Self::Ram { start, .. } | Self::Rom { start, .. } => *start,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Ram { data, .. } | Self::Rom { data, .. } => data.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, addr: u16) -> bool {
        let offset = addr.wrapping_sub(self.start()) as usize;
        addr >= self.start() && offset < self.len()
    }
}

/// The machine bus: sorted region list plus device claim table.
pub struct MemoryMap {
    regions: Vec<MemoryRegion>,
    devices: Vec<Box<dyn Device>>,
    /// Word address to indices of claiming devices.
    claims: BTreeMap<u16, Vec<usize>>,
}

impl MemoryMap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            regions: Vec::new(),
            devices: Vec::new(),
            claims: BTreeMap::new(),
        }
    }

    /// Insert a region, keeping the list sorted.
    ///
    /// # Panics
    ///
    /// Panics if the region overlaps an existing one; overlapping maps are
    /// a construction error, not a runtime condition.
    pub fn add_region(&mut self, region: MemoryRegion) {
        let start = region.start();
        let end = start as usize + region.len();
        assert!(end <= 0x1_0000, "region extends past the address space");
        for existing in &self.regions {
            let e_start = existing.start() as usize;
            let e_end = e_start + existing.len();
            assert!(
                end <= e_start || e_end <= start as usize,
                "memory regions overlap at {start:#o}"
            );
        }
        let pos = self
            .regions
            .partition_point(|r| r.start() < start);
        self.regions.insert(pos, region);
    }

    /// Register a device under every address it claims.
    pub fn add_device(&mut self, device: Box<dyn Device>) {
        let index = self.devices.len();
        for &addr in device.addresses() {
            self.claims.entry(addr & !1).or_default().push(index);
        }
        self.devices.push(device);
    }

    pub(crate) fn devices(&self) -> &[Box<dyn Device>] {
        &self.devices
    }

    pub(crate) fn devices_mut(&mut self) -> &mut [Box<dyn Device>] {
        &mut self.devices
    }

    fn region_for(&self, addr: u16) -> Option<&MemoryRegion> {
        let idx = self.regions.partition_point(|r| r.start() <= addr);
        if idx == 0 {
            return None;
        }
        let region = &self.regions[idx - 1];
        region.contains(addr).then_some(region)
    }

    fn region_for_mut(&mut self, addr: u16) -> Option<&mut MemoryRegion> {
        let idx = self.regions.partition_point(|r| r.start() <= addr);
        if idx == 0 {
            return None;
        }
        let region = &mut self.regions[idx - 1];
        if region.contains(addr) {
            Some(region)
        } else {
            None
        }
    }

    /// OR together the reads of every device claiming the word address.
    fn device_read(&mut self, time: Cycles, word_addr: u16) -> Option<u16> {
        let indices = self.claims.get(&word_addr)?.clone();
        let mut value = 0;
        for index in indices {
            value |= self.devices[index].read(time, word_addr);
        }
        Some(value)
    }

    fn device_write(
        &mut self,
        time: Cycles,
        byte_mode: bool,
        word_addr: u16,
        value: u16,
    ) -> bool {
        let Some(indices) = self.claims.get(&word_addr).cloned() else {
            return false;
        };
        for index in indices {
            self.devices[index].write(time, byte_mode, word_addr, value);
        }
        true
    }

    fn ram_read_byte(&self, addr: u16) -> Result<u8, BusError> {
        match self.region_for(addr) {
            Some(MemoryRegion::Ram { start, data }) | Some(MemoryRegion::Rom { start, data }) => {
                Ok(data[addr.wrapping_sub(*start) as usize])
            }
            None => Err(BusError::Unmapped(addr)),
        }
    }
}

impl Default for MemoryMap {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for MemoryMap {
    fn read_word(&mut self, time: Cycles, addr: u16) -> Result<u16, BusError> {
        if addr & 1 != 0 {
            return Err(BusError::OddAddress(addr));
        }
        if let Some(value) = self.device_read(time, addr) {
            return Ok(value);
        }
        let low = self.ram_read_byte(addr)?;
        let high = self.ram_read_byte(addr.wrapping_add(1))?;
        Ok(u16::from(low) | (u16::from(high) << 8))
    }

    fn read_byte(&mut self, time: Cycles, addr: u16) -> Result<u8, BusError> {
        let word_addr = addr & !1;
        if self.claims.contains_key(&word_addr) {
            let word = self.device_read(time, word_addr).unwrap_or(0);
            return Ok(if addr & 1 != 0 {
                (word >> 8) as u8
            } else {
                word as u8
            });
        }
        self.ram_read_byte(addr)
    }

    fn write_word(&mut self, time: Cycles, addr: u16, value: u16) -> Result<(), BusError> {
        if addr & 1 != 0 {
            return Err(BusError::OddAddress(addr));
        }
        if self.device_write(time, false, addr, value) {
            return Ok(());
        }
        match self.region_for_mut(addr) {
            Some(MemoryRegion::Ram { start, data }) => {
                let offset = addr.wrapping_sub(*start) as usize;
                if offset + 1 >= data.len() {
                    return Err(BusError::Unmapped(addr.wrapping_add(1)));
                }
                data[offset] = value as u8;
                data[offset + 1] = (value >> 8) as u8;
                Ok(())
            }
            Some(MemoryRegion::Rom { .. }) => Err(BusError::ReadOnly(addr)),
            None => Err(BusError::Unmapped(addr)),
        }
    }

    fn write_byte(&mut self, time: Cycles, addr: u16, value: u8) -> Result<(), BusError> {
        let word_addr = addr & !1;
        if self.claims.contains_key(&word_addr) {
            // Merge the byte into the current device word so claimants see
            // a full register value.
            let current = self.device_read(time, word_addr).unwrap_or(0);
            let merged = if addr & 1 != 0 {
                (current & 0o377) | (u16::from(value) << 8)
            } else {
                (current & 0o177400) | u16::from(value)
            };
            self.device_write(time, true, word_addr, merged);
            return Ok(());
        }
        match self.region_for_mut(addr) {
            Some(MemoryRegion::Ram { start, data }) => {
                data[addr.wrapping_sub(*start) as usize] = value;
                Ok(())
            }
            Some(MemoryRegion::Rom { .. }) => Err(BusError::ReadOnly(addr)),
            None => Err(BusError::Unmapped(addr)),
        }
    }

    fn reset_devices(&mut self, time: Cycles) {
        for device in &mut self.devices {
            device.init(time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> Cycles {
        Cycles::ZERO
    }

    #[test]
    fn ram_round_trips_words_and_bytes() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::ram(0, 0o20000));

        map.write_word(t(), 0o1000, 0o123456).unwrap();
        assert_eq!(map.read_word(t(), 0o1000).unwrap(), 0o123456);

        map.write_byte(t(), 0o1001, 0o377).unwrap();
        assert_eq!(map.read_byte(t(), 0o1000).unwrap(), 0o056);
        assert_eq!(map.read_byte(t(), 0o1001).unwrap(), 0o377);
    }

    #[test]
    fn rom_rejects_writes() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::rom_from_words(0o100000, &[0o5000]));

        assert_eq!(map.read_word(t(), 0o100000).unwrap(), 0o5000);
        assert_eq!(
            map.write_word(t(), 0o100000, 1),
            Err(BusError::ReadOnly(0o100000))
        );
        assert_eq!(
            map.write_byte(t(), 0o100001, 1),
            Err(BusError::ReadOnly(0o100001))
        );
    }

    #[test]
    fn unmapped_access_is_a_bus_error() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::ram(0, 0o1000));

        assert_eq!(map.read_word(t(), 0o2000), Err(BusError::Unmapped(0o2000)));
        assert_eq!(
            map.write_word(t(), 0o2000, 0),
            Err(BusError::Unmapped(0o2000))
        );
    }

    #[test]
    fn odd_word_access_is_a_bus_error() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::ram(0, 0o1000));

        assert_eq!(map.read_word(t(), 0o101), Err(BusError::OddAddress(0o101)));
    }

    #[test]
    #[should_panic(expected = "overlap")]
    fn overlapping_regions_panic() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::ram(0, 0o1000));
        map.add_region(MemoryRegion::ram(0o776, 0o100));
    }

    #[test]
    fn lookup_straddles_region_boundaries() {
        let mut map = MemoryMap::new();
        map.add_region(MemoryRegion::ram(0o2000, 0o1000));
        map.add_region(MemoryRegion::ram(0, 0o1000));

        map.write_word(t(), 0o776, 0o111).unwrap();
        map.write_word(t(), 0o2000, 0o222).unwrap();
        assert_eq!(map.read_word(t(), 0o776).unwrap(), 0o111);
        assert_eq!(map.read_word(t(), 0o2000).unwrap(), 0o222);
        // The gap between the regions stays unmapped.
        assert_eq!(map.read_word(t(), 0o1000), Err(BusError::Unmapped(0o1000)));
    }
}

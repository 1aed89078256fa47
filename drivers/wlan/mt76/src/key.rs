// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Key binding and key register programming.
//!
//! A key is bound to exactly one WCID: a peer's own slot for pairwise keys, or the owning
//! interface's group slot for group keys. Group keys are additionally mirrored into the
//! per-interface shared-key table.

use {
    crate::{error::Error, hw::RegisterIo, regs::*, slot::Slot, wcid::Wcid},
    log::debug,
};

pub const CIPHER_SUITE_WEP40: u32 = 0x000f_ac01;
pub const CIPHER_SUITE_TKIP: u32 = 0x000f_ac02;
pub const CIPHER_SUITE_CCMP: u32 = 0x000f_ac04;
pub const CIPHER_SUITE_WEP104: u32 = 0x000f_ac05;

/// Highest key index the shared-key table can address.
pub const MAX_KEY_INDEX: u8 = 3;

const TKIP_TK_LEN: usize = 16;
const TKIP_MIC_LEN: usize = 8;

/// Hardware cipher encoding used by the WCID attribute and shared-key mode registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Cipher {
    None = 0,
    Wep40 = 1,
    Wep104 = 2,
    Tkip = 3,
    Ccmp = 4,
}

impl Cipher {
    pub fn from_suite(suite: u32) -> Option<Self> {
        match suite {
            CIPHER_SUITE_WEP40 => Some(Cipher::Wep40),
            CIPHER_SUITE_WEP104 => Some(Cipher::Wep104),
            CIPHER_SUITE_TKIP => Some(Cipher::Tkip),
            CIPHER_SUITE_CCMP => Some(Cipher::Ccmp),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetKeyCmd {
    Set,
    Disable,
}

/// Key handed down by the host stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyConf {
    pub cipher: u32,
    pub keyidx: u8,
    pub key: Vec<u8>,
    pub pairwise: bool,
    /// Slot the key was installed into. Filled in on install.
    pub hw_key_idx: Option<Slot>,
}

/// Where a key binds.
#[derive(Clone, Copy, Debug)]
pub enum KeyTarget<'a> {
    Peer(&'a Wcid),
    Group { wcid: &'a Wcid, iface_idx: u8 },
}

impl<'a> KeyTarget<'a> {
    fn wcid(&self) -> &'a Wcid {
        match *self {
            KeyTarget::Peer(wcid) => wcid,
            KeyTarget::Group { wcid, .. } => wcid,
        }
    }
}

/// Cipher and key bytes in the layout the key registers expect.
fn key_material(key: Option<&KeyConf>) -> Result<(Cipher, [u8; MT_KEY_DATA_LEN]), Error> {
    let mut data = [0u8; MT_KEY_DATA_LEN];
    let key = match key {
        Some(key) => key,
        None => return Ok((Cipher::None, data)),
    };
    let cipher = Cipher::from_suite(key.cipher).ok_or(Error::UnsupportedCipher(key.cipher))?;
    if key.key.len() > MT_KEY_DATA_LEN {
        return Err(Error::InvalidArgs("key material longer than 32 bytes"));
    }
    data[..key.key.len()].copy_from_slice(&key.key);
    if cipher == Cipher::Tkip && key.key.len() == MT_KEY_DATA_LEN {
        // The hardware expects the RX MIC key ahead of the TX MIC key.
        let (tx_mic, rx_mic) = data[TKIP_TK_LEN..].split_at_mut(TKIP_MIC_LEN);
        tx_mic.swap_with_slice(rx_mic);
    }
    Ok((cipher, data))
}

/// Programs (or, with no key, clears) the key, cipher attributes and IV word of a WCID.
pub fn wcid_set_key<R: RegisterIo + ?Sized>(
    regs: &R,
    slot: Slot,
    key: Option<&KeyConf>,
) -> Result<(), Error> {
    let (cipher, data) = key_material(key)?;
    let idx = slot.reg();

    regs.wr_copy(mt_wcid_key(idx), &data);
    regs.rmw_field(mt_wcid_attr(idx), MT_WCID_ATTR_PKEY_MODE, cipher as u32);

    let mut iv = [0u8; MT_WCID_IV_LEN];
    if let Some(key) = key {
        regs.rmw_field(mt_wcid_attr(idx), MT_WCID_ATTR_PAIRWISE, key.pairwise as u32);
        iv[3] = key.keyidx << 6;
        if cipher >= Cipher::Tkip {
            // Extended IV.
            iv[3] |= 0x20;
        }
    }
    regs.wr_copy(mt_wcid_iv(idx), &iv);
    Ok(())
}

/// Programs (or clears) one entry of an interface's shared-key table.
pub fn shared_key_setup<R: RegisterIo + ?Sized>(
    regs: &R,
    iface_idx: u8,
    key_idx: u8,
    key: Option<&KeyConf>,
) -> Result<(), Error> {
    let (cipher, data) = key_material(key)?;
    let (vif, key_idx) = (iface_idx as u32, key_idx as u32);

    regs.rmw(
        mt_skey_mode(vif),
        MT_SKEY_MODE_MASK << mt_skey_mode_shift(vif, key_idx),
        (cipher as u32) << mt_skey_mode_shift(vif, key_idx),
    );
    regs.wr_copy(mt_skey(vif, key_idx), &data);
    Ok(())
}

/// Installs or removes `key` on `target`, keeping the in-memory binding and the hardware in step.
///
/// Removal always reverts the binding to the sentinel when it matched. A group slot is only
/// reprogrammed on install or when it held the removed key. A failure programming the group slot
/// leaves the shared-key table untouched.
pub fn set_key<R: RegisterIo + ?Sized>(
    regs: &R,
    target: KeyTarget<'_>,
    cmd: SetKeyCmd,
    key: &mut KeyConf,
) -> Result<(), Error> {
    if key.keyidx > MAX_KEY_INDEX {
        return Err(Error::InvalidArgs("key index out of range"));
    }
    let wcid = target.wcid();
    let key_idx = key.keyidx;
    let (was_bound, conf) = match cmd {
        SetKeyCmd::Set => {
            // Reject what the hardware cannot hold before touching the binding.
            key_material(Some(key))?;
            key.hw_key_idx = Some(wcid.slot());
            wcid.bind_key(key_idx);
            (true, Some(&*key))
        }
        SetKeyCmd::Disable => (wcid.unbind_key(key_idx), None),
    };
    debug!("{:?} key {} on slot {}", cmd, key_idx, wcid.slot());

    match target {
        KeyTarget::Peer(wcid) => wcid_set_key(regs, wcid.slot(), conf),
        KeyTarget::Group { wcid, iface_idx } => {
            if conf.is_some() || was_bound {
                wcid_set_key(regs, wcid.slot(), conf)?;
            }
            shared_key_setup(regs, iface_idx, key_idx, conf)
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::hw::FakeHardware,
        assert_matches::assert_matches,
        test_case::test_case,
    };

    fn ccmp_key(keyidx: u8, pairwise: bool) -> KeyConf {
        KeyConf {
            cipher: CIPHER_SUITE_CCMP,
            keyidx,
            key: (1..=16).collect(),
            pairwise,
            hw_key_idx: None,
        }
    }

    #[test_case(CIPHER_SUITE_WEP40, Cipher::Wep40; "wep40")]
    #[test_case(CIPHER_SUITE_WEP104, Cipher::Wep104; "wep104")]
    #[test_case(CIPHER_SUITE_TKIP, Cipher::Tkip; "tkip")]
    #[test_case(CIPHER_SUITE_CCMP, Cipher::Ccmp; "ccmp")]
    fn cipher_mapping(suite: u32, cipher: Cipher) {
        assert_eq!(Cipher::from_suite(suite), Some(cipher));
    }

    #[test]
    fn unknown_cipher_is_unsupported() {
        assert_eq!(Cipher::from_suite(0x000f_ac06), None);
        let hw = FakeHardware::new();
        let mut key = ccmp_key(1, true);
        key.cipher = 0x000f_ac06;
        let wcid = Wcid::new(Slot(3));
        assert_matches!(
            set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Set, &mut key),
            Err(Error::UnsupportedCipher(0x000f_ac06))
        );
        assert_eq!(wcid.key_index(), None);
        assert_eq!(key.hw_key_idx, None);
    }

    #[test]
    fn tkip_mic_halves_swapped() {
        let key = KeyConf {
            cipher: CIPHER_SUITE_TKIP,
            keyidx: 0,
            key: (0..32).collect(),
            pairwise: true,
            hw_key_idx: None,
        };
        let (cipher, data) = key_material(Some(&key)).unwrap();
        assert_eq!(cipher, Cipher::Tkip);
        assert_eq!(&data[..16], &key.key[..16]);
        assert_eq!(&data[16..24], &key.key[24..32]);
        assert_eq!(&data[24..32], &key.key[16..24]);
    }

    #[test]
    fn pairwise_install_and_remove() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot(5));
        let mut key = ccmp_key(2, true);

        set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Set, &mut key).unwrap();
        assert_eq!(wcid.key_index(), Some(2));
        assert_eq!(key.hw_key_idx, Some(Slot(5)));
        // IV byte 3 carries the key index and the extended IV bit.
        assert_eq!(hw.reg(mt_wcid_iv(5)), ((2 << 6) | 0x20) << 24);
        let attr = hw.reg(mt_wcid_attr(5));
        assert_eq!(field_get(MT_WCID_ATTR_PKEY_MODE, attr), Cipher::Ccmp as u32);
        assert_eq!(attr & MT_WCID_ATTR_PAIRWISE, MT_WCID_ATTR_PAIRWISE);
        assert_eq!(hw.reg(mt_wcid_key(5)), 0x0403_0201);

        set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Disable, &mut key).unwrap();
        assert_eq!(wcid.key_index(), None);
        assert_eq!(hw.reg(mt_wcid_iv(5)), 0);
        assert_eq!(hw.reg(mt_wcid_key(5)), 0);
        assert_eq!(field_get(MT_WCID_ATTR_PKEY_MODE, hw.reg(mt_wcid_attr(5))), 0);
    }

    #[test]
    fn removing_other_index_keeps_binding_but_clears_slot() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot(5));
        let mut key = ccmp_key(2, true);
        set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Set, &mut key).unwrap();

        let mut other = ccmp_key(1, true);
        set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Disable, &mut other).unwrap();
        assert_eq!(wcid.key_index(), Some(2));
        assert_eq!(hw.reg(mt_wcid_iv(5)), 0);
    }

    #[test]
    fn wep_iv_has_no_extended_bit() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot(1));
        let mut key = KeyConf {
            cipher: CIPHER_SUITE_WEP40,
            keyidx: 3,
            key: vec![0xaa; 5],
            pairwise: false,
            hw_key_idx: None,
        };
        set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Set, &mut key).unwrap();
        assert_eq!(hw.reg(mt_wcid_iv(1)), (3 << 6) << 24);
        assert_eq!(hw.reg(mt_wcid_attr(1)) & MT_WCID_ATTR_PAIRWISE, 0);
    }

    #[test]
    fn group_install_programs_slot_and_shared_table() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot::group(3));
        let mut key = ccmp_key(1, false);

        set_key(&hw, KeyTarget::Group { wcid: &wcid, iface_idx: 3 }, SetKeyCmd::Set, &mut key)
            .unwrap();
        assert_eq!(wcid.key_index(), Some(1));
        assert_eq!(hw.reg(mt_wcid_iv(252)), ((1 << 6) | 0x20) << 24);
        assert_eq!(hw.reg(mt_skey_mode(3)), (Cipher::Ccmp as u32) << mt_skey_mode_shift(3, 1));
        assert_eq!(hw.reg(mt_skey(3, 1)), 0x0403_0201);
    }

    #[test]
    fn group_remove_clears_bound_slot() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot::group(0));
        let target = KeyTarget::Group { wcid: &wcid, iface_idx: 0 };
        let mut key = ccmp_key(1, false);
        set_key(&hw, target, SetKeyCmd::Set, &mut key).unwrap();

        set_key(&hw, target, SetKeyCmd::Disable, &mut key).unwrap();
        assert_eq!(wcid.key_index(), None);
        assert_eq!(hw.reg(mt_wcid_iv(255)), 0);
        assert_eq!(hw.reg(mt_wcid_key(255)), 0);
        assert_eq!(hw.reg(mt_skey_mode(0)), 0);
        assert_eq!(hw.reg(mt_skey(0, 1)), 0);
    }

    #[test]
    fn group_remove_of_unbound_index_leaves_slot() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot::group(0));
        let target = KeyTarget::Group { wcid: &wcid, iface_idx: 0 };
        let mut bound = ccmp_key(1, false);
        set_key(&hw, target, SetKeyCmd::Set, &mut bound).unwrap();
        let mut stale = ccmp_key(2, false);
        set_key(&hw, target, SetKeyCmd::Set, &mut stale).unwrap();
        let mut first = ccmp_key(1, false);

        // Index 2 is now bound; removing index 1 must not wipe the slot.
        set_key(&hw, target, SetKeyCmd::Disable, &mut first).unwrap();
        assert_eq!(wcid.key_index(), Some(2));
        assert_eq!(hw.reg(mt_wcid_iv(255)), ((2 << 6) | 0x20) << 24);
        assert_eq!(hw.reg(mt_skey(0, 1)), 0);
        assert_eq!(hw.reg(mt_skey(0, 2)), 0x0403_0201);
    }

    #[test]
    fn shared_key_mode_preserves_neighbours() {
        let hw = FakeHardware::new();
        hw.wr(mt_skey_mode(5), 0xffff_ffff);
        shared_key_setup(&hw, 5, 2, None).unwrap();
        assert_eq!(hw.reg(mt_skey_mode(5)), !(0xf << (16 + 8)));
    }

    #[test]
    fn key_index_out_of_range() {
        let hw = FakeHardware::new();
        let wcid = Wcid::new(Slot(0));
        let mut key = ccmp_key(4, true);
        assert_matches!(
            set_key(&hw, KeyTarget::Peer(&wcid), SetKeyCmd::Set, &mut key),
            Err(Error::InvalidArgs(_))
        );
    }
}

//
// Copyright (c) 2023 ZettaScale Technology
//
// This program and the accompanying materials are made available under the
// terms of the Eclipse Public License 2.0 which is available at
// http://www.eclipse.org/legal/epl-2.0, or the Apache License, Version 2.0
// which is available at https://www.apache.org/licenses/LICENSE-2.0.
//
// SPDX-License-Identifier: EPL-2.0 OR Apache-2.0
//
// Contributors:
//   ZettaScale Zenoh Team, <zenoh@zettascale.tech>
//
pub mod extension;
pub use extension::*;

/*************************************/
/*               IDS                 */
/*************************************/
pub mod imsg {
    // Header mask
    pub const HEADER_BITS: u8 = 5;
    pub const HEADER_MASK: u8 = !(0xff << HEADER_BITS);

    pub const fn mid(header: u8) -> u8 {
        header & HEADER_MASK
    }

    pub const fn flags(header: u8) -> u8 {
        header & !HEADER_MASK
    }

    pub const fn has_flag(byte: u8, flag: u8) -> bool {
        byte & flag != 0
    }

    /// `flag` when `cond` holds, 0 otherwise.
    pub const fn flag_if(cond: bool, flag: u8) -> u8 {
        if cond {
            flag
        } else {
            0
        }
    }

    pub const fn has_option(options: u64, flag: u64) -> bool {
        options & flag != 0
    }
}

#[cfg(test)]
mod tests {
    use super::imsg;

    #[test]
    fn header_split() {
        let header = 0b1110_0101;
        assert_eq!(imsg::mid(header), 0b0_0101);
        assert_eq!(imsg::flags(header), 0b1110_0000);
        assert!(imsg::has_flag(header, 1 << 7));
        assert!(!imsg::has_flag(0b0100_0000, 1 << 5));
        assert_eq!(imsg::flag_if(true, 0x40) | imsg::flag_if(false, 0x20), 0x40);
    }
}

//! Decoders for protocols tunnelled over UDP

pub mod ieee802154;
pub mod zep;

use crate::error::FrameError;
use crate::records::{CaptureSource, MeshSighting};

use self::ieee802154::parse_mac_header;
use self::zep::parse_zep;

/// Decode a ZEP datagram and its embedded 802.15.4 header into a mesh sighting
pub fn decode_mesh_sighting(
    payload: &[u8],
    source: &CaptureSource,
) -> Result<MeshSighting, FrameError> {
    let zep = parse_zep(payload)?;
    let mac = parse_mac_header(zep.payload)?;
    let intra_pan = mac.fcf.intra_pan();
    let source_pan = if intra_pan { mac.dst_pan } else { None };
    Ok(MeshSighting {
        channel: zep.channel(),
        zep_dst_device: zep.dst_device,
        zep_src_device: zep.src_device,
        dst_device: mac.dst_addr,
        src_device: mac.src_addr,
        target_pan: mac.dst_pan,
        source_pan,
        intra_pan,
        source: source.clone(),
    })
}

//! DXGI Desktop Duplication capture.
//!
//! Uses the Direct3D 11 Desktop Duplication API to obtain GPU-backed
//! desktop frames together with pointer-shape changes.
//!
//! # Platform
//!
//! This module is **Windows-only**. On other platforms the type is still
//! defined but construction fails with [`CaptureError::Unsupported`].

use crate::capture::types::{FrameBuffer, PointerShapeUpdate};
use crate::capture::{Acquire, BackendKind, CaptureBackend, SourceFrame};
use crate::error::CaptureError;
use crate::geometry::Point;

/// Desktop Duplication backend.
///
/// Wraps the `IDXGIOutputDuplication` pipeline:
///
/// 1. Create a D3D11 device.
/// 2. Enumerate outputs and duplicate the target monitor.
/// 3. Create a CPU-readable staging texture.
/// 4. On each [`acquire`](CaptureBackend::acquire):
///    - `AcquireNextFrame` (blocks up to the timeout).
///    - Copy the desktop texture to the staging texture.
///    - Fetch the pointer shape if the frame carries one.
///    - Map, copy into the reusable [`FrameBuffer`], unmap.
/// 5. [`release`](CaptureBackend::release) calls `ReleaseFrame`.
///
/// `ACCESS_LOST` maps to [`CaptureError::DeviceLost`]; the owner drops
/// this value and builds a new one.
pub struct DuplicationBackend {
    monitor_index: u32,
    buffer: FrameBuffer,
    /// `AcquireNextFrame` succeeded and `ReleaseFrame` is still owed.
    frame_held: bool,
    pending_shape: Option<PointerShapeUpdate>,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    shape_serial: u64,

    // ── Platform handles (Windows only) ──────────────────────
    #[cfg(target_os = "windows")]
    context: windows::Win32::Graphics::Direct3D11::ID3D11DeviceContext,
    #[cfg(target_os = "windows")]
    duplication: windows::Win32::Graphics::Dxgi::IDXGIOutputDuplication,
    #[cfg(target_os = "windows")]
    staging_texture: windows::Win32::Graphics::Direct3D11::ID3D11Texture2D,
    #[cfg(target_os = "windows")]
    _device: windows::Win32::Graphics::Direct3D11::ID3D11Device,
}

impl DuplicationBackend {
    /// Index of the duplicated output.
    pub fn monitor_index(&self) -> u32 {
        self.monitor_index
    }

    /// Desktop position of the duplicated output.
    pub fn origin(&self) -> Point {
        self.buffer.origin
    }

    pub fn width(&self) -> u32 {
        self.buffer.width
    }

    pub fn height(&self) -> u32 {
        self.buffer.height
    }
}

// ── Windows implementation ───────────────────────────────────────

#[cfg(target_os = "windows")]
mod platform {
    use std::time::Duration;

    use super::*;
    use crate::capture::types::{PixelFormat, ShapeKind};
    use tracing::{debug, trace};
    use windows::{
        Win32::Graphics::{
            Direct3D::D3D_DRIVER_TYPE_HARDWARE,
            Direct3D11::*,
            Dxgi::{Common::*, *},
        },
        core::Interface,
    };

    fn is_loss(code: windows::core::HRESULT) -> bool {
        code == DXGI_ERROR_ACCESS_LOST
            || code == DXGI_ERROR_DEVICE_REMOVED
            || code == DXGI_ERROR_DEVICE_RESET
            || code == DXGI_ERROR_SESSION_DISCONNECTED
    }

    impl DuplicationBackend {
        /// Initialise duplication of output `monitor_index` (0 = first).
        pub fn new(monitor_index: u32) -> Result<Self, CaptureError> {
            unsafe { Self::init_dxgi(monitor_index) }
        }

        unsafe fn init_dxgi(monitor_index: u32) -> Result<Self, CaptureError> {
            // 1. Create D3D11 device + immediate context.
            let mut device = None;
            let mut context = None;
            unsafe {
                D3D11CreateDevice(
                    None,
                    D3D_DRIVER_TYPE_HARDWARE,
                    None,
                    D3D11_CREATE_DEVICE_BGRA_SUPPORT,
                    None,
                    D3D11_SDK_VERSION,
                    Some(&mut device),
                    None,
                    Some(&mut context),
                )
                .map_err(|e| CaptureError::Backend(format!("D3D11CreateDevice failed: {e}")))?;
            }

            let device: ID3D11Device =
                device.ok_or_else(|| CaptureError::Backend("D3D11 device is None".into()))?;
            let context = context
                .ok_or_else(|| CaptureError::Backend("D3D11 context is None".into()))?;

            // 2. Device → Adapter → Output.
            let dxgi_device: IDXGIDevice = device
                .cast()
                .map_err(|e| CaptureError::Backend(format!("cast to IDXGIDevice failed: {e}")))?;
            let adapter = unsafe {
                dxgi_device
                    .GetAdapter()
                    .map_err(|e| CaptureError::Backend(format!("GetAdapter failed: {e}")))?
            };
            let output: IDXGIOutput = unsafe {
                adapter.EnumOutputs(monitor_index).map_err(|e| {
                    CaptureError::Backend(format!("EnumOutputs({monitor_index}) failed: {e}"))
                })?
            };
            let output_desc = unsafe {
                output
                    .GetDesc()
                    .map_err(|e| CaptureError::Backend(format!("GetDesc failed: {e}")))?
            };
            let origin = Point::new(
                output_desc.DesktopCoordinates.left,
                output_desc.DesktopCoordinates.top,
            );

            // 3. Duplicate the output. Losing the race against a mode
            //    change or the secure desktop is a device loss too.
            let output1: IDXGIOutput1 = output
                .cast()
                .map_err(|e| CaptureError::Backend(format!("cast to IDXGIOutput1 failed: {e}")))?;
            let duplication = unsafe {
                output1.DuplicateOutput(&device).map_err(|e| {
                    if is_loss(e.code()) {
                        CaptureError::DeviceLost(format!("DuplicateOutput: {e}"))
                    } else {
                        CaptureError::Backend(format!("DuplicateOutput failed: {e}"))
                    }
                })?
            };

            let dup_desc = unsafe { duplication.GetDesc() };
            let width = dup_desc.ModeDesc.Width;
            let height = dup_desc.ModeDesc.Height;

            // 4. CPU-readable staging texture.
            let staging_desc = D3D11_TEXTURE2D_DESC {
                Width: width,
                Height: height,
                MipLevels: 1,
                ArraySize: 1,
                Format: DXGI_FORMAT_B8G8R8A8_UNORM,
                SampleDesc: DXGI_SAMPLE_DESC {
                    Count: 1,
                    Quality: 0,
                },
                Usage: D3D11_USAGE_STAGING,
                BindFlags: 0,
                CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
                MiscFlags: 0,
            };

            let mut staging_texture = None;
            unsafe {
                device
                    .CreateTexture2D(&staging_desc, None, Some(&mut staging_texture))
                    .map_err(|e| {
                        CaptureError::Backend(format!("CreateTexture2D (staging) failed: {e}"))
                    })?;
            }
            let staging_texture = staging_texture
                .ok_or_else(|| CaptureError::Backend("staging texture is None".into()))?;

            debug!(monitor_index, width, height, ?origin, "desktop duplication ready");

            Ok(Self {
                monitor_index,
                buffer: FrameBuffer::new(width, height, PixelFormat::Bgra8, origin),
                frame_held: false,
                pending_shape: None,
                shape_serial: 0,
                context,
                duplication,
                staging_texture,
                _device: device,
            })
        }

        unsafe fn acquire_inner(&mut self, timeout: Duration) -> Result<Acquire, CaptureError> {
            let timeout_ms = timeout.as_millis().min(u32::MAX as u128) as u32;
            let mut frame_info = DXGI_OUTDUPL_FRAME_INFO::default();
            let mut resource = None;

            match unsafe {
                self.duplication
                    .AcquireNextFrame(timeout_ms, &mut frame_info, &mut resource)
            } {
                Ok(()) => {}
                Err(e) if e.code() == DXGI_ERROR_WAIT_TIMEOUT => {
                    return Err(CaptureError::Timeout(timeout));
                }
                Err(e) if is_loss(e.code()) => {
                    return Err(CaptureError::DeviceLost(format!("AcquireNextFrame: {e}")));
                }
                Err(e) => {
                    return Err(CaptureError::Backend(format!("AcquireNextFrame failed: {e}")));
                }
            }
            self.frame_held = true;

            let resource = match resource {
                Some(r) => r,
                None => {
                    self.release();
                    return Err(CaptureError::Backend("acquired resource is None".into()));
                }
            };

            let texture: ID3D11Texture2D = resource.cast().map_err(|e| {
                self.release();
                CaptureError::Backend(format!("cast to ID3D11Texture2D failed: {e}"))
            })?;

            // GPU texture → staging texture.
            unsafe {
                self.context.CopyResource(&self.staging_texture, &texture);
            }

            if frame_info.PointerShapeBufferSize > 0 {
                self.fetch_pointer_shape(frame_info.PointerShapeBufferSize);
            }

            // Map the staging texture for CPU read.
            let mut mapped = D3D11_MAPPED_SUBRESOURCE::default();
            if let Err(e) = unsafe {
                self.context
                    .Map(&self.staging_texture, 0, D3D11_MAP_READ, 0, Some(&mut mapped))
            } {
                self.release();
                return Err(CaptureError::Backend(format!("Map failed: {e}")));
            }

            let stride = mapped.RowPitch;
            let total_bytes = stride as usize * self.buffer.height as usize;
            let src = unsafe { std::slice::from_raw_parts(mapped.pData as *const u8, total_bytes) };
            self.buffer.copy_rows(src, stride);

            unsafe { self.context.Unmap(&self.staging_texture, 0) };

            trace!(
                accumulated = frame_info.AccumulatedFrames,
                stride,
                "duplication frame acquired"
            );
            Ok(Acquire::Frame)
        }

        fn fetch_pointer_shape(&mut self, size: u32) {
            let mut data = vec![0u8; size as usize];
            let mut required = 0u32;
            let mut info = DXGI_OUTDUPL_POINTER_SHAPE_INFO::default();
            let result = unsafe {
                self.duplication.GetFramePointerShape(
                    size,
                    data.as_mut_ptr() as *mut _,
                    &mut required,
                    &mut info,
                )
            };
            if let Err(e) = result {
                debug!("GetFramePointerShape failed: {e}");
                return;
            }

            let kind = match info.Type {
                t if t == DXGI_OUTDUPL_POINTER_SHAPE_TYPE_MONOCHROME.0 as u32 => {
                    ShapeKind::Monochrome
                }
                t if t == DXGI_OUTDUPL_POINTER_SHAPE_TYPE_COLOR.0 as u32 => ShapeKind::Color,
                t if t == DXGI_OUTDUPL_POINTER_SHAPE_TYPE_MASKED_COLOR.0 as u32 => {
                    ShapeKind::MaskedColor
                }
                other => {
                    debug!("unknown pointer shape type {other}");
                    return;
                }
            };

            data.truncate(required as usize);
            self.shape_serial += 1;
            self.pending_shape = Some(PointerShapeUpdate {
                kind,
                width: info.Width,
                height: info.Height,
                pitch: info.Pitch,
                hotspot: Point::new(info.HotSpot.x, info.HotSpot.y),
                shape_id: self.shape_serial,
                data,
            });
        }
    }

    impl CaptureBackend for DuplicationBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Duplication
        }

        fn acquire(&mut self, timeout: Duration) -> Result<Acquire, CaptureError> {
            // A caller that skipped release still must not starve the queue.
            self.release();
            unsafe { self.acquire_inner(timeout) }
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            self.frame_held.then(|| self.buffer.as_frame())
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            self.pending_shape.take()
        }

        fn release(&mut self) {
            if self.frame_held {
                self.frame_held = false;
                let _ = unsafe { self.duplication.ReleaseFrame() };
            }
        }
    }

    impl Drop for DuplicationBackend {
        fn drop(&mut self) {
            self.release();
        }
    }
}

// ── Non-Windows stub ─────────────────────────────────────────────

#[cfg(not(target_os = "windows"))]
mod stub {
    use std::time::Duration;

    use super::*;

    impl DuplicationBackend {
        /// Desktop Duplication is only available on Windows.
        pub fn new(_monitor_index: u32) -> Result<Self, CaptureError> {
            Err(CaptureError::Unsupported {
                kind: BackendKind::Duplication,
                reason: "Desktop Duplication is only available on Windows",
            })
        }
    }

    impl CaptureBackend for DuplicationBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Duplication
        }

        fn acquire(&mut self, _timeout: Duration) -> Result<Acquire, CaptureError> {
            Err(CaptureError::Backend("not supported on this platform".into()))
        }

        fn frame(&self) -> Option<SourceFrame<'_>> {
            self.frame_held.then(|| self.buffer.as_frame())
        }

        fn pointer_shape_update(&mut self) -> Option<PointerShapeUpdate> {
            self.pending_shape.take()
        }

        fn release(&mut self) {
            self.frame_held = false;
        }
    }
}

#[cfg(all(test, not(target_os = "windows")))]
mod tests {
    use super::*;

    #[test]
    fn construction_fails_off_windows() {
        let err = DuplicationBackend::new(0).err().unwrap();
        assert!(matches!(
            err,
            CaptureError::Unsupported {
                kind: BackendKind::Duplication,
                ..
            }
        ));
    }
}

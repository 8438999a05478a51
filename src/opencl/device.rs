//! Устройство OpenCL поверх сырых привязок

use super::bindings::*;
use super::callbacks::log_context_notification;
use super::types::*;
use super::utils::to_c_string;
use crate::compute::{AccessMode, ComputeDevice, ComputeError, ComputeResult, KernelArg, NdRange};
use crate::config::ComputeConfig;
use crate::{cl_check, cl_create};
use std::ffi::c_void;
use std::mem::size_of;
use std::ptr;

/// Первое устройство нужного типа на первой платформе, один контекст
pub struct OpenClDevice {
    context: cl_context,
    device: cl_device_id,
    name: String,
}

// Объекты OpenCL, кроме cl_kernel, потокобезопасны.
// Ядро создаётся заново на каждый запуск.
unsafe impl Send for OpenClDevice {}
unsafe impl Sync for OpenClDevice {}

impl OpenClDevice {
    pub fn open_first(device_type: cl_device_type) -> ComputeResult<Self> {
        let mut platform: cl_platform_id = ptr::null_mut();
        let mut num_platforms: cl_uint = 0;
        cl_check!(
            "clGetPlatformIDs",
            clGetPlatformIDs(1, &mut platform, &mut num_platforms)
        )?;
        if num_platforms == 0 {
            return Err(ComputeError::device("clGetPlatformIDs", CL_INVALID_PLATFORM));
        }

        let mut device: cl_device_id = ptr::null_mut();
        let mut num_devices: cl_uint = 0;
        cl_check!(
            "clGetDeviceIDs",
            clGetDeviceIDs(platform, device_type, 1, &mut device, &mut num_devices)
        )?;
        if num_devices == 0 {
            return Err(ComputeError::device("clGetDeviceIDs", CL_DEVICE_NOT_FOUND));
        }

        let context = cl_create!(clCreateContext(
            ptr::null(),
            1,
            &device,
            Some(log_context_notification),
            ptr::null_mut()
        ))?;

        Ok(Self {
            context,
            device,
            name: device_name(device),
        })
    }

    fn build_log(&self, program: &ClProgram) -> ComputeResult<String> {
        let mut log_size = 0usize;
        cl_check!(
            "clGetProgramBuildInfo",
            clGetProgramBuildInfo(
                program.0,
                self.device,
                CL_PROGRAM_BUILD_LOG,
                0,
                ptr::null_mut(),
                &mut log_size
            )
        )?;

        let mut log = vec![0u8; log_size];
        cl_check!(
            "clGetProgramBuildInfo",
            clGetProgramBuildInfo(
                program.0,
                self.device,
                CL_PROGRAM_BUILD_LOG,
                log_size,
                log.as_mut_ptr() as *mut c_void,
                ptr::null_mut()
            )
        )?;
        Ok(String::from_utf8_lossy(&log).trim_end_matches('\0').to_string())
    }
}

fn device_name(device: cl_device_id) -> String {
    let mut size = 0usize;
    let queried = cl_check!(
        "clGetDeviceInfo",
        clGetDeviceInfo(device, CL_DEVICE_NAME, 0, ptr::null_mut(), &mut size)
    );
    if queried.is_err() || size == 0 {
        return "OpenCL device".to_string();
    }

    let mut name = vec![0u8; size];
    let queried = cl_check!(
        "clGetDeviceInfo",
        clGetDeviceInfo(
            device,
            CL_DEVICE_NAME,
            size,
            name.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        )
    );
    match queried {
        Ok(()) => String::from_utf8_lossy(&name).trim_end_matches('\0').to_string(),
        Err(_) => "OpenCL device".to_string(),
    }
}

fn create_kernel(program: &ClProgram, entry_point: &str) -> ComputeResult<ClKernel> {
    let name = to_c_string(entry_point);
    cl_create!(clCreateKernel(program.0, name.as_ptr())).map(ClKernel)
}

impl Drop for OpenClDevice {
    fn drop(&mut self) {
        unsafe {
            clReleaseContext(self.context);
        }
    }
}

/// Очередь команд (in-order)
pub struct ClQueue(cl_command_queue);
/// Собранная программа
pub struct ClProgram(cl_program);
/// Буфер в памяти устройства
pub struct ClBuffer(cl_mem);

struct ClKernel(cl_kernel);

unsafe impl Send for ClQueue {}
unsafe impl Sync for ClQueue {}
unsafe impl Send for ClProgram {}
unsafe impl Sync for ClProgram {}
unsafe impl Send for ClBuffer {}
unsafe impl Sync for ClBuffer {}

impl Drop for ClQueue {
    fn drop(&mut self) {
        unsafe {
            clReleaseCommandQueue(self.0);
        }
    }
}

impl Drop for ClProgram {
    fn drop(&mut self) {
        unsafe {
            clReleaseProgram(self.0);
        }
    }
}

impl Drop for ClBuffer {
    fn drop(&mut self) {
        unsafe {
            clReleaseMemObject(self.0);
        }
    }
}

impl Drop for ClKernel {
    fn drop(&mut self) {
        unsafe {
            clReleaseKernel(self.0);
        }
    }
}

impl ComputeDevice for OpenClDevice {
    type Buffer = ClBuffer;
    type Program = ClProgram;
    type Queue = ClQueue;

    fn open(config: &ComputeConfig) -> ComputeResult<Self> {
        Self::open_first(config.device_type.device_type())
    }

    fn description(&self) -> String {
        self.name.clone()
    }

    fn create_queue(&self) -> ComputeResult<ClQueue> {
        // Без CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE команды идут по порядку
        cl_create!(clCreateCommandQueue(self.context, self.device, 0)).map(ClQueue)
    }

    fn build_program(&self, name: &str, source: &str, options: &str) -> ComputeResult<ClProgram> {
        let source_ptr = source.as_ptr() as *const i8;
        let length = source.len();
        let program = ClProgram(cl_create!(clCreateProgramWithSource(
            self.context,
            1,
            &source_ptr,
            &length
        ))?);

        let options = to_c_string(options);
        let built = cl_check!(
            "clBuildProgram",
            clBuildProgram(
                program.0,
                1,
                &self.device,
                options.as_ptr(),
                None,
                ptr::null_mut()
            )
        );

        match built {
            Ok(()) => Ok(program),
            Err(err) if err.code() == Some(CL_BUILD_PROGRAM_FAILURE) => {
                Err(ComputeError::BuildFailure {
                    program: name.to_string(),
                    log: self.build_log(&program)?,
                })
            }
            Err(err) => Err(err),
        }
    }

    fn kernel_arg_count(&self, program: &ClProgram, entry_point: &str) -> ComputeResult<usize> {
        let kernel = create_kernel(program, entry_point)?;
        let mut count: cl_uint = 0;
        cl_check!(
            "clGetKernelInfo",
            clGetKernelInfo(
                kernel.0,
                CL_KERNEL_NUM_ARGS,
                size_of::<cl_uint>(),
                &mut count as *mut cl_uint as *mut c_void,
                ptr::null_mut()
            )
        )?;
        Ok(count as usize)
    }

    fn create_buffer(
        &self,
        access: AccessMode,
        size_bytes: usize,
        host: Option<&[f32]>,
    ) -> ComputeResult<ClBuffer> {
        let host_ptr = match (access.copies_host_data(), host) {
            (true, Some(host)) if host.len() * size_of::<f32>() >= size_bytes => {
                host.as_ptr() as *mut c_void
            }
            (false, None) => ptr::null_mut(),
            _ => return Err(ComputeError::device("clCreateBuffer", CL_INVALID_HOST_PTR)),
        };

        cl_create!(clCreateBuffer(
            self.context,
            access.flags(),
            size_bytes,
            host_ptr
        ))
        .map(ClBuffer)
    }

    fn enqueue_kernel(
        &self,
        queue: &ClQueue,
        program: &ClProgram,
        entry_point: &str,
        range: &NdRange,
        args: &[KernelArg<'_, ClBuffer>],
    ) -> ComputeResult<()> {
        let kernel = create_kernel(program, entry_point)?;

        for (index, arg) in args.iter().enumerate() {
            let index = index as cl_uint;
            match arg {
                KernelArg::Int(value) => cl_check!(
                    "clSetKernelArg",
                    clSetKernelArg(
                        kernel.0,
                        index,
                        size_of::<cl_int>(),
                        value as *const cl_int as *const c_void
                    )
                )?,
                KernelArg::Buffer(buffer) => cl_check!(
                    "clSetKernelArg",
                    clSetKernelArg(
                        kernel.0,
                        index,
                        size_of::<cl_mem>(),
                        &buffer.0 as *const cl_mem as *const c_void
                    )
                )?,
                // Локальная память: только размер, без данных
                KernelArg::Local(bytes) => cl_check!(
                    "clSetKernelArg",
                    clSetKernelArg(kernel.0, index, *bytes, ptr::null())
                )?,
            }
        }

        let global = range.global();
        let local = range.local().map_or(ptr::null(), |local| local.as_ptr());
        cl_check!(
            "clEnqueueNDRangeKernel",
            clEnqueueNDRangeKernel(
                queue.0,
                kernel.0,
                range.dims() as cl_uint,
                ptr::null(),
                global.as_ptr(),
                local,
                0,
                ptr::null(),
                ptr::null_mut()
            )
        )
    }

    fn read_buffer(&self, queue: &ClQueue, buffer: &ClBuffer, out: &mut [f32]) -> ComputeResult<()> {
        cl_check!(
            "clEnqueueReadBuffer",
            clEnqueueReadBuffer(
                queue.0,
                buffer.0,
                CL_TRUE,
                0,
                out.len() * size_of::<f32>(),
                out.as_mut_ptr() as *mut c_void,
                0,
                ptr::null(),
                ptr::null_mut()
            )
        )
    }
}

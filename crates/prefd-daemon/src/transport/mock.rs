//! Mock transport for unit and integration testing.
//!
//! Backed by a self-pipe: every injected request writes one byte to the
//! write end, so the read end becomes readable and the real event loop wakes
//! through the same `poll(2)` path a production transport would use. The
//! daemon binary also wires this implementation until a system-bus backend
//! is linked in.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use super::{
    Access, AccessError, BusError, ObjectHandle, PropertyBus, PropertyRequest, PropertySpec,
    RequestToken,
};
use prefd_core::ConfigValue;

/// One object registered on the mock bus.
#[derive(Debug)]
pub struct RegisteredObject {
    pub path: String,
    pub properties: Vec<PropertySpec>,
}

/// An in-process [`PropertyBus`] that records everything for assertions.
pub struct MockBus {
    read_end: File,
    write_end: File,
    pending: VecDeque<PropertyRequest>,
    next_token: u64,
    objects: Vec<RegisteredObject>,
    replies: Vec<(RequestToken, Result<ConfigValue, AccessError>)>,
    signals: Vec<(ObjectHandle, String)>,
    close_when_idle: bool,
}

impl MockBus {
    /// Creates a mock bus with an open self-pipe.
    pub fn new() -> io::Result<Self> {
        let (read_end, write_end) = nix::unistd::pipe().map_err(io::Error::from)?;

        Ok(Self {
            read_end: File::from(read_end),
            write_end: File::from(write_end),
            pending: VecDeque::new(),
            next_token: 0,
            objects: Vec::new(),
            replies: Vec::new(),
            signals: Vec::new(),
            close_when_idle: false,
        })
    }

    /// Makes `next_request` report [`BusError::Closed`] once the injected
    /// requests are drained, so a test-driven event loop terminates.
    pub fn close_when_idle(mut self) -> Self {
        self.close_when_idle = true;
        self
    }

    /// Injects a property read, as if a remote caller accessed the property.
    pub fn inject_get(&mut self, object: ObjectHandle, property: &str) -> RequestToken {
        self.inject(object, property, Access::Get)
    }

    /// Injects a property write.
    pub fn inject_set(
        &mut self,
        object: ObjectHandle,
        property: &str,
        value: ConfigValue,
    ) -> RequestToken {
        self.inject(object, property, Access::Set(value))
    }

    fn inject(&mut self, object: ObjectHandle, property: &str, access: Access) -> RequestToken {
        let token = RequestToken(self.next_token);
        self.next_token += 1;

        self.pending.push_back(PropertyRequest {
            token,
            object,
            property: property.to_owned(),
            access,
        });

        // Wake the poll loop: one byte per pending request.
        (&self.write_end)
            .write_all(&[1])
            .expect("self-pipe write failed");

        token
    }

    /// Returns every object registered so far, in registration order.
    pub fn objects(&self) -> &[RegisteredObject] {
        &self.objects
    }

    /// Looks up a registered object handle by path.
    pub fn find_object(&self, path: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .position(|object| object.path == path)
            .map(ObjectHandle)
    }

    /// Returns every reply sent so far, in order.
    pub fn replies(&self) -> &[(RequestToken, Result<ConfigValue, AccessError>)] {
        &self.replies
    }

    /// Returns every properties-changed signal emitted so far, in order.
    pub fn signals(&self) -> &[(ObjectHandle, String)] {
        &self.signals
    }
}

impl PropertyBus for MockBus {
    fn register_object(
        &mut self,
        object_path: &str,
        properties: &[PropertySpec],
    ) -> Result<ObjectHandle, BusError> {
        if self.objects.iter().any(|object| object.path == object_path) {
            return Err(BusError::DuplicateObject(object_path.to_owned()));
        }

        self.objects.push(RegisteredObject {
            path: object_path.to_owned(),
            properties: properties.to_vec(),
        });

        Ok(ObjectHandle(self.objects.len() - 1))
    }

    fn poll_fds(&self) -> Vec<BorrowedFd<'_>> {
        vec![self.read_end.as_fd()]
    }

    fn poll_timeout(&self) -> Option<Duration> {
        // With nothing left to serve, a closing bus only needs a short grace
        // period; a long-lived one can block until woken.
        if self.close_when_idle {
            Some(Duration::from_millis(50))
        } else {
            None
        }
    }

    fn next_request(&mut self) -> Result<Option<PropertyRequest>, BusError> {
        match self.pending.pop_front() {
            Some(request) => {
                // Consume the wake byte paired with this request.
                let mut byte = [0u8; 1];
                (&self.read_end).read_exact(&mut byte)?;
                Ok(Some(request))
            }
            None if self.close_when_idle => Err(BusError::Closed),
            None => Ok(None),
        }
    }

    fn reply(
        &mut self,
        token: RequestToken,
        result: Result<ConfigValue, AccessError>,
    ) -> Result<(), BusError> {
        if token.0 >= self.next_token {
            return Err(BusError::UnknownToken(token.0));
        }
        self.replies.push((token, result));
        Ok(())
    }

    fn emit_properties_changed(
        &mut self,
        object: ObjectHandle,
        property: &str,
    ) -> Result<(), BusError> {
        if object.0 >= self.objects.len() {
            return Err(BusError::UnknownObject(object.0));
        }
        self.signals.push((object, property.to_owned()));
        Ok(())
    }
}

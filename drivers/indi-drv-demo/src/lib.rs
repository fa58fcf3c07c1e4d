// Copyright (c) 2020-2021, Richard M Neswold, Jr.
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! A simulated temperature/heater controller, giving `indi-api`'s
//! driver-supplied property handlers one concrete shape so the
//! library can be exercised end to end.
//!
//! A small state machine tracks how long the heater has been on vs.
//! off so it can report a duty cycle.

pub mod config;

use config::Params;
use indi_api::emit;
use indi_api::property::{
    NumberMember, NumberVector, Permission, State, SwitchMember, SwitchRule, SwitchState,
    SwitchVector,
};
use indi_api::types::name::{Device, Key, Property};
use indi_api::update::{self, BlobUpdate};
use indi_api::xml::Element;
use indi_api::{config as indi_config_file, DriverContext, Handlers};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::warn;

const PROP_TEMPERATURE: &str = "TEMPERATURE";
const PROP_TARGET: &str = "TARGET_TEMPERATURE";
const PROP_HEATER: &str = "HEATER";
const PROP_DUTY: &str = "DUTY_CYCLE";
const PROP_CONFIG: &str = "CONFIG_PROCESS";

/// Tracks the fraction of wall-clock time the heater has spent on,
/// for the `DUTY_CYCLE` readback.
struct DutyTracker {
    heater_on: bool,
    since: Instant,
    on_seconds: f64,
    total_seconds: f64,
}

impl DutyTracker {
    fn new() -> Self {
        DutyTracker {
            heater_on: false,
            since: Instant::now(),
            on_seconds: 0.0,
            total_seconds: 0.0,
        }
    }

    fn accumulate(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.since).as_secs_f64();
        self.total_seconds += elapsed;
        if self.heater_on {
            self.on_seconds += elapsed;
        }
        self.since = now;
    }

    fn set_heater(&mut self, on: bool) {
        self.accumulate();
        self.heater_on = on;
    }

    fn duty_percent(&mut self) -> f64 {
        self.accumulate();
        if self.total_seconds <= 0.0 {
            0.0
        } else {
            100.0 * self.on_seconds / self.total_seconds
        }
    }
}

pub struct HeaterDriver {
    device: Device,
    params: Params,
    temperature: Arc<Mutex<NumberVector>>,
    target: Arc<Mutex<NumberVector>>,
    heater: Arc<Mutex<SwitchVector>>,
    duty: Arc<Mutex<NumberVector>>,
    config_process: Arc<Mutex<SwitchVector>>,
    tracker: Mutex<DutyTracker>,
    current_c: Mutex<f64>,
}

impl HeaterDriver {
    pub fn new(device: Device, params: Params) -> indi_api::Result<Self> {
        let temperature = NumberVector::new(
            device.clone(),
            Property::new(PROP_TEMPERATURE)?,
            "Temperature",
            Permission::ReadOnly,
            vec![NumberMember::new(
                "TEMP",
                "Temperature (C)",
                "%.2f",
                -50.0,
                150.0,
                0.0,
                params.ambient_c,
            )],
        );
        let target = NumberVector::new(
            device.clone(),
            Property::new(PROP_TARGET)?,
            "Target Temperature",
            Permission::ReadWrite,
            vec![NumberMember::new(
                "TARGET",
                "Target (C)",
                "%.2f",
                -50.0,
                150.0,
                0.1,
                params.target_c,
            )],
        );
        let heater = SwitchVector::new(
            device.clone(),
            Property::new(PROP_HEATER)?,
            "Heater",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
            vec![
                SwitchMember::new("ON", "On", SwitchState::Off),
                SwitchMember::new("OFF", "Off", SwitchState::On),
            ],
        );
        let duty = NumberVector::new(
            device.clone(),
            Property::new(PROP_DUTY)?,
            "Duty Cycle",
            Permission::ReadOnly,
            vec![NumberMember::new(
                "PERCENT", "Percent on", "%.1f", 0.0, 100.0, 0.0, 0.0,
            )],
        );
        let config_process = SwitchVector::new(
            device.clone(),
            Property::new(PROP_CONFIG)?,
            "Config",
            Permission::ReadWrite,
            SwitchRule::OneOfMany,
            vec![
                SwitchMember::new("CONFIG_LOAD", "Load", SwitchState::Off),
                SwitchMember::new("CONFIG_SAVE", "Save", SwitchState::Off),
                SwitchMember::new("CONFIG_DEFAULT", "Default", SwitchState::Off),
                SwitchMember::new("CONFIG_PURGE", "Purge", SwitchState::Off),
            ],
        );

        let ambient_c = params.ambient_c;

        Ok(HeaterDriver {
            device,
            params,
            temperature: Arc::new(Mutex::new(temperature)),
            target: Arc::new(Mutex::new(target)),
            heater: Arc::new(Mutex::new(heater)),
            duty: Arc::new(Mutex::new(duty)),
            config_process: Arc::new(Mutex::new(config_process)),
            tracker: Mutex::new(DutyTracker::new()),
            current_c: Mutex::new(ambient_c),
        })
    }

    pub fn define_properties(&self, ctx: &DriverContext) -> std::io::Result<()> {
        emit::define_number(ctx.sink.as_ref(), &ctx.registry, &self.temperature, None)?;
        emit::define_number(ctx.sink.as_ref(), &ctx.registry, &self.target, None)?;
        emit::define_switch(ctx.sink.as_ref(), &ctx.registry, &self.heater, None)?;
        emit::define_number(ctx.sink.as_ref(), &ctx.registry, &self.duty, None)?;
        emit::define_switch(ctx.sink.as_ref(), &ctx.registry, &self.config_process, None)?;
        Ok(())
    }

    /// Advances the simulated enclosure by `dt` seconds and reports
    /// the new temperature and duty cycle.
    pub fn tick(&self, ctx: &DriverContext, dt: f64) {
        let heater_on = {
            let heater = self.heater.lock().expect("heater mutex poisoned");
            heater.on_name() == Some("ON")
        };

        let reading = {
            let mut current = self.current_c.lock().expect("current_c mutex poisoned");
            let drift = if heater_on {
                self.params.heater_rate
            } else {
                -0.1 * (*current - self.params.ambient_c)
            };
            *current += drift * dt;
            *current
        };

        {
            let mut temperature = self.temperature.lock().expect("temperature mutex poisoned");
            if let Some(m) = temperature.find_mut("TEMP") {
                m.value = reading;
            }
            let _ = emit::set_number(ctx.sink.as_ref(), &temperature, None);
        }

        let percent = self
            .tracker
            .lock()
            .expect("tracker mutex poisoned")
            .duty_percent();
        {
            let mut duty = self.duty.lock().expect("duty mutex poisoned");
            if let Some(m) = duty.find_mut("PERCENT") {
                m.value = percent;
            }
            let _ = emit::set_number(ctx.sink.as_ref(), &duty, None);
        }
    }

    fn handle_target(&self, ctx: &DriverContext, values: Vec<(String, f64)>) {
        let pairs: Vec<(&str, f64)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let mut target = self.target.lock().expect("target mutex poisoned");
        match update::update_number(&mut target, &pairs) {
            Ok(()) => {
                target.state = State::Ok;
                let _ = emit::set_number(ctx.sink.as_ref(), &target, None);
            }
            Err(e) => {
                let _ = emit::set_number(ctx.sink.as_ref(), &target, Some(&e.to_string()));
            }
        }
    }

    fn handle_heater(&self, ctx: &DriverContext, values: Vec<(String, SwitchState)>) {
        let pairs: Vec<(&str, SwitchState)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let mut heater = self.heater.lock().expect("heater mutex poisoned");
        match update::update_switch(&mut heater, &pairs) {
            Ok(()) => {
                heater.state = State::Ok;
                let on = heater.on_name() == Some("ON");
                self.tracker
                    .lock()
                    .expect("tracker mutex poisoned")
                    .set_heater(on);
                let _ = emit::set_switch(ctx.sink.as_ref(), &heater, None);
            }
            Err(e) => {
                let _ = emit::set_switch(ctx.sink.as_ref(), &heater, Some(&e.to_string()));
            }
        }
    }

    fn handle_config(&self, ctx: &DriverContext, values: Vec<(String, SwitchState)>) {
        let pairs: Vec<(&str, SwitchState)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        let action = {
            let mut config_process = self.config_process.lock().expect("config_process mutex poisoned");
            if update::update_switch(&mut config_process, &pairs).is_err() {
                let _ = emit::set_switch(ctx.sink.as_ref(), &config_process, None);
                return;
            }
            let action = config_process.on_name().map(str::to_string);
            for m in config_process.members.iter_mut() {
                m.state = SwitchState::Off;
            }
            config_process.state = State::Ok;
            let _ = emit::set_switch(ctx.sink.as_ref(), &config_process, None);
            action
        };

        match action.as_deref() {
            Some("CONFIG_LOAD") => {
                if let Err(e) = indi_config_file::load_and_apply(ctx, self, None, &self.device, None, false) {
                    warn!(%e, "failed to load configuration");
                }
            }
            Some("CONFIG_SAVE") => {
                if let Err(e) = self.save_config(ctx) {
                    warn!(%e, "failed to save configuration");
                }
            }
            Some("CONFIG_DEFAULT") => {
                if let Err(e) = indi_config_file::save_as_default(None, None, &self.device) {
                    warn!(%e, "failed to save default configuration");
                }
            }
            Some("CONFIG_PURGE") => {
                if let Err(e) = indi_config_file::purge(None, &self.device) {
                    warn!(%e, "failed to purge configuration");
                }
            }
            _ => {}
        }
    }

    fn save_config(&self, ctx: &DriverContext) -> std::io::Result<()> {
        indi_config_file::save_config_tag(ctx, &self.device, 0, false)?;
        indi_config_file::save_number(
            ctx.sink.as_ref(),
            &self.target.lock().expect("target mutex poisoned"),
        )?;
        indi_config_file::save_switch(
            ctx.sink.as_ref(),
            &self.heater.lock().expect("heater mutex poisoned"),
        )?;
        indi_config_file::save_config_tag(ctx, &self.device, 1, false)
    }
}

impl Handlers for HeaterDriver {
    fn broadcast_properties(&self, ctx: &DriverContext, device: Option<&Device>) {
        if device.is_some_and(|d| d != &self.device) {
            return;
        }
        let _ = self.define_properties(ctx);
    }

    fn snoop(&self, _ctx: &DriverContext, _element: &Element) {}

    fn new_number(&self, ctx: &DriverContext, key: &Key, values: Vec<(String, f64)>) {
        match key.property.as_str() {
            PROP_TARGET => self.handle_target(ctx, values),
            other => warn!(property = other, "unexpected number update"),
        }
    }

    fn new_switch(&self, ctx: &DriverContext, key: &Key, values: Vec<(String, SwitchState)>) {
        match key.property.as_str() {
            PROP_HEATER => self.handle_heater(ctx, values),
            PROP_CONFIG => self.handle_config(ctx, values),
            other => warn!(property = other, "unexpected switch update"),
        }
    }

    fn new_text(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<(String, String)>) {}

    fn new_blob(&self, _ctx: &DriverContext, _key: &Key, _values: Vec<BlobUpdate>) {}
}

/*
    SPDX-License-Identifier: AGPL-3.0-or-later
    SPDX-FileCopyrightText: 2025 Shomy
*/
#[cfg(feature = "i2cdev")]
pub mod i2cdev_backend;
#[cfg(feature = "i2cdev")]
pub use i2cdev_backend::I2cDevDdc;

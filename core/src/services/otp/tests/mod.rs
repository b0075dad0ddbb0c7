//! Tests for the OTP lifecycle services

/*
 *  lib.rs
 *
 *  LyTicker - ticks on paper
 *	(c) 2020-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

//! Stock ticker dashboard for a six colour e-paper panel.

pub mod bmp;
pub mod cache;
pub mod chart;
pub mod clock;
pub mod config;
pub mod constants;
pub mod display;
pub mod draw;
pub mod func_timer;
pub mod http;
pub mod market;
pub mod netcheck;
pub mod quote;
pub mod refresh;
pub mod svgimage;
pub mod vframebuf;
pub mod weather;

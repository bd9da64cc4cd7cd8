pub mod biomechanics;
pub mod extraction;
pub mod managers;
pub mod orchestration;
pub mod pose;
pub mod results;
pub mod steps;

fn main() {
    pedestrian_pipeline::cli::run();
}
